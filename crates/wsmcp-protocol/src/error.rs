//! Error taxonomy shared by the codec, transports and client engine.

use std::time::Duration;

use thiserror::Error;

use crate::message::{MessageId, RpcError};

/// Result alias used throughout wsmcp.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between a caller and the server.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// An operation needed a live connection and there was none.
    #[error("Not connected to a server")]
    NotConnected,

    /// `connect` was called while another dial was in flight.
    #[error("A connection attempt is already in progress")]
    AlreadyConnecting,

    /// `connect` was called on a live connection.
    #[error("Already connected")]
    AlreadyConnected,

    /// The transport could not be established.
    #[error("Failed to connect to {url}: {reason}")]
    Dial {
        /// Server URL that was dialed
        url: String,
        /// Underlying failure
        reason: String,
    },

    /// An outbound message could not be serialized.
    #[error("Failed to encode message: {0}")]
    Encode(String),

    /// An inbound frame or payload could not be parsed.
    #[error("Failed to decode message: {0}")]
    Decode(String),

    /// No correlated response arrived in time.
    #[error("Request '{method}' timed out after {timeout:?}")]
    Timeout {
        /// Method of the request that timed out
        method: String,
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// The server answered with an `error` object.
    #[error("Server error {}: {}", .0.code, .0.message)]
    Remote(RpcError),

    /// A request id was registered twice while still pending.
    #[error("Request id {0} is already pending")]
    DuplicateId(MessageId),

    /// The transport failed while sending or receiving.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The connection went away before a response arrived.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The operation was abandoned because the engine is shutting down.
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Whether repeating the same call later could reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Transport(_) | Self::ConnectionClosed | Self::Dial { .. }
        )
    }

    /// The remote error object, if the server produced one.
    pub fn as_remote(&self) -> Option<&RpcError> {
        match self {
            Self::Remote(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RpcError> for Error {
    fn from(e: RpcError) -> Self {
        Self::Remote(e)
    }
}
