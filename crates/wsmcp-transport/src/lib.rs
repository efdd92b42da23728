//! # wsmcp Transport
//!
//! The narrow byte-frame contract the client engine talks through, and the
//! transports that implement it.
//!
//! - **Traits**: [`Transport`] (one live connection) and [`Connector`] (dials one)
//! - **Types**: [`TransportMessage`], [`FrameKind`], [`TransportType`]
//! - **Errors**: [`TransportError`], [`TransportResult`]
//! - **Implementations**: [`WebSocketTransport`]/[`WebSocketConnector`] over
//!   tokio-tungstenite, and [`MemoryTransport`]/[`MemoryConnector`] for tests
//!
//! ```rust,no_run
//! use wsmcp_transport::{Connector, TransportMessage, WebSocketConnector};
//!
//! # async fn demo() -> wsmcp_transport::TransportResult<()> {
//! let transport = WebSocketConnector::new().connect("ws://localhost:3000").await?;
//! transport.send(TransportMessage::text(r#"{"id":"1","method":"ping"}"#)).await?;
//! let reply = transport.receive().await?;
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

mod error;
pub mod memory;
mod message;
mod traits;
pub mod websocket;

pub use error::{TransportError, TransportResult};
pub use memory::{MemoryConnector, MemoryListener, MemoryTransport};
pub use message::{FrameKind, TransportMessage};
pub use traits::{Connector, Transport, TransportType};
pub use websocket::{WebSocketConnector, WebSocketTransport};
