//! Frames exchanged with a [`Transport`](crate::Transport).

use bytes::Bytes;

/// Whether a frame travelled as text or binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// UTF-8 text frame (the protocol's native form)
    Text,
    /// Binary frame, passed through untouched
    Binary,
}

/// One data frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportMessage {
    /// Frame body
    pub payload: Bytes,
    /// Frame type
    pub kind: FrameKind,
}

impl TransportMessage {
    /// A text frame.
    pub fn text(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            kind: FrameKind::Text,
        }
    }

    /// A binary frame.
    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            kind: FrameKind::Binary,
        }
    }

    /// Payload length in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Payload as UTF-8, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}
