//! The transport contract.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{TransportMessage, TransportResult};

/// Which kind of transport is behind a trait object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    /// WebSocket (`ws://`, `wss://`)
    WebSocket,
    /// In-process channel pair
    Memory,
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WebSocket => f.write_str("websocket"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// A live, bidirectional frame channel.
///
/// `send` and `receive` take `&self` and must not block each other: the client
/// keeps one task parked in `receive` while other tasks send.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Returns the type of this transport.
    fn transport_type(&self) -> TransportType;

    /// The address this transport is connected to, if it has one.
    fn endpoint(&self) -> Option<String> {
        None
    }

    /// Write one frame.
    async fn send(&self, message: TransportMessage) -> TransportResult<()>;

    /// Wait for the next data frame. `Ok(None)` means the peer closed cleanly.
    async fn receive(&self) -> TransportResult<Option<TransportMessage>>;

    /// Close the connection. Calling this more than once is a no-op.
    async fn close(&self) -> TransportResult<()>;

    /// Whether `close` has been called or the peer has gone away.
    fn is_closed(&self) -> bool;
}

/// Dials new [`Transport`]s.
#[async_trait]
pub trait Connector: Send + Sync + fmt::Debug {
    /// Returns the type of transport this connector produces.
    fn transport_type(&self) -> TransportType;

    /// Establish a connection to `url`.
    async fn connect(&self, url: &str) -> TransportResult<Arc<dyn Transport>>;
}
