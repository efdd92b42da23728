//! The protocol envelope.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Identifier correlating a request with its response.
///
/// The engine always generates string IDs, but numeric IDs from other peers
/// are accepted and echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    /// String identifier (UUID v4 for engine-generated requests)
    String(String),
    /// Numeric identifier
    Number(i64),
}

impl MessageId {
    /// Generate a fresh UUID v4 identifier.
    pub fn new_v4() -> Self {
        Self::String(Uuid::new_v4().to_string())
    }

    /// Whether this is the empty string some peers send in place of "no id".
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::String(s) if s.is_empty())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<i64> for MessageId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<Uuid> for MessageId {
    fn from(id: Uuid) -> Self {
        Self::String(id.to_string())
    }
}

/// Error object carried in a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct RpcError {
    /// Numeric error code
    pub code: i64,
    /// Human-readable description
    pub message: String,
    /// Optional structured details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// JSON-RPC "Parse error".
    pub const PARSE_ERROR: i64 = -32700;
    /// JSON-RPC "Invalid Request".
    pub const INVALID_REQUEST: i64 = -32600;
    /// JSON-RPC "Method not found".
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// JSON-RPC "Invalid params".
    pub const INVALID_PARAMS: i64 = -32602;
    /// JSON-RPC "Internal error".
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Create an error with an arbitrary code.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured details.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// The requested method does not exist on the peer.
    pub fn method_not_found(method: &str) -> Self {
        Self::new(Self::METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    /// The request parameters were rejected.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_PARAMS, message)
    }

    /// The peer failed while handling the request.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(Self::INTERNAL_ERROR, message)
    }
}

/// How a message is meant to be read, judged from its fields alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Carries `method` and `id`; the sender expects a reply.
    Request,
    /// Carries `method` and no `id`.
    Notification,
    /// Carries `result` or `error`.
    Response,
}

/// A single protocol message as it appears on the wire.
///
/// Exactly one of `method` or `result`/`error` is meaningful for a given
/// message. Empty-string `id` and `method` values are read as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Correlation identifier
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "non_empty_id"
    )]
    pub id: Option<MessageId>,

    /// Method name for requests and notifications
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "non_empty_method"
    )]
    pub method: Option<String>,

    /// Request parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,

    /// Successful response payload. A present `null` is kept as
    /// `Some(Value::Null)`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_value"
    )]
    pub result: Option<Value>,

    /// Failed response payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

fn non_empty_id<'de, D>(deserializer: D) -> std::result::Result<Option<MessageId>, D::Error>
where
    D: Deserializer<'de>,
{
    let id = Option::<MessageId>::deserialize(deserializer)?;
    Ok(id.filter(|id| !id.is_empty()))
}

fn non_empty_method<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let method = Option::<String>::deserialize(deserializer)?;
    Ok(method.filter(|m| !m.is_empty()))
}

fn present_value<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Message {
    /// Build a request expecting a correlated reply.
    pub fn request(id: MessageId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id: Some(id),
            method: Some(method.into()),
            params,
            ..Self::default()
        }
    }

    /// Build a notification (no `id`, no reply expected).
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            method: Some(method.into()),
            params,
            ..Self::default()
        }
    }

    /// Build a successful response.
    pub fn response(id: MessageId, result: Value) -> Self {
        Self {
            id: Some(id),
            result: Some(result),
            ..Self::default()
        }
    }

    /// Build an error response.
    pub fn error_response(id: Option<MessageId>, error: RpcError) -> Self {
        Self {
            id,
            error: Some(error),
            ..Self::default()
        }
    }

    /// Build the `pong` answering a `ping` with the given id.
    pub fn pong(id: Option<MessageId>) -> Self {
        Self {
            id,
            method: Some(crate::methods::PONG.to_owned()),
            ..Self::default()
        }
    }

    /// Classify the message by the fields it carries.
    pub fn kind(&self) -> MessageKind {
        if self.result.is_some() || self.error.is_some() {
            MessageKind::Response
        } else if self.id.is_some() {
            MessageKind::Request
        } else {
            MessageKind::Notification
        }
    }

    /// Method name, or `""` when absent.
    pub fn method_name(&self) -> &str {
        self.method.as_deref().unwrap_or_default()
    }

    /// Turn a reply into its payload, surfacing a remote `error` as
    /// [`Error::Remote`]. A reply with neither field yields `Value::Null`.
    pub fn into_result(self) -> Result<Value> {
        match (self.error, self.result) {
            (Some(error), _) => Err(Error::Remote(error)),
            (None, Some(result)) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}
