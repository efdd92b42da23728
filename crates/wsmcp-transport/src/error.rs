//! Transport error types.

use thiserror::Error;

/// A specialized `Result` type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Represents errors that can occur during transport operations.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum TransportError {
    /// The endpoint URL is unusable for this transport.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to establish a connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// An established connection was lost.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Failed to send a message.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive a message.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// The transport was closed locally.
    #[error("Transport closed")]
    Closed,
}

impl From<TransportError> for wsmcp_protocol::Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Closed => Self::ConnectionClosed,
            other => Self::Transport(other.to_string()),
        }
    }
}
