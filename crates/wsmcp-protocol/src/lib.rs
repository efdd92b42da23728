//! # wsmcp Protocol
//!
//! Wire-level building blocks shared by every wsmcp crate:
//!
//! - **Envelope**: [`Message`], [`MessageId`], [`RpcError`]
//! - **Payloads**: handshake and tool shapes in [`types`]
//! - **Codec**: [`Codec`] and the canonical [`JsonCodec`]
//! - **Errors**: the unified [`Error`] taxonomy and [`Result`] alias
//!
//! ```rust
//! use wsmcp_protocol::{Message, MessageId, codec};
//!
//! let request = Message::request(MessageId::from("1"), "tools/list", None);
//! let bytes = codec::encode(&request).unwrap();
//! assert_eq!(codec::decode(&bytes).unwrap(), request);
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

pub mod codec;
mod error;
mod message;
pub mod types;

pub use codec::{Codec, JsonCodec};
pub use error::{Error, Result};
pub use message::{Message, MessageId, MessageKind, RpcError};
pub use types::{
    ClientCapabilities, ClientInfo, Content, InitializeRequest, InitializeResult,
    ListToolsResult, ServerCapabilities, ServerInfo, Tool, ToolCall, ToolResult,
};

/// Protocol revision negotiated during `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Method names understood by the client engine.
pub mod methods {
    /// Capability-negotiation handshake.
    pub const INITIALIZE: &str = "initialize";
    /// Tool discovery.
    pub const TOOLS_LIST: &str = "tools/list";
    /// Tool invocation.
    pub const TOOLS_CALL: &str = "tools/call";
    /// Liveness probe.
    pub const PING: &str = "ping";
    /// Reply to a `ping`.
    pub const PONG: &str = "pong";
}
