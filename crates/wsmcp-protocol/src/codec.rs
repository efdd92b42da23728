//! Wire codec.
//!
//! Messages travel as one JSON object per text frame. [`JsonCodec`] is the
//! only codec wsmcp ships; the [`Codec`] trait exists so transports and tests
//! can be written against the seam rather than `serde_json` directly.

use std::fmt;

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::message::Message;

/// Converts values to and from frame payloads.
pub trait Codec: Send + Sync + fmt::Debug {
    /// Serialize a value into a frame payload.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Bytes>;

    /// Parse a frame payload.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;

    /// MIME type of the produced payloads.
    fn content_type(&self) -> &'static str;
}

/// Compact JSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Decode a frame into a [`Message`].
    ///
    /// Besides being valid JSON, the frame must be an object that carries a
    /// `method` or a `result`/`error`; anything else cannot be routed.
    pub fn decode_message(&self, bytes: &[u8]) -> Result<Message> {
        let value: Value = self.decode(bytes)?;
        if !value.is_object() {
            return Err(Error::Decode(format!(
                "expected a JSON object, found {}",
                json_type_name(&value)
            )));
        }
        let message: Message =
            serde_json::from_value(value).map_err(|e| Error::Decode(e.to_string()))?;
        if message.method.is_none() && message.result.is_none() && message.error.is_none() {
            return Err(Error::Decode(
                "message carries neither a method nor a result or error".to_owned(),
            ));
        }
        Ok(message)
    }
}

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Bytes> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| Error::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| Error::Decode(e.to_string()))
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Encode a message with [`JsonCodec`].
pub fn encode(message: &Message) -> Result<Bytes> {
    JsonCodec.encode(message)
}

/// Decode a message with [`JsonCodec`].
pub fn decode(bytes: &[u8]) -> Result<Message> {
    JsonCodec.decode_message(bytes)
}
