//! Low-level messaging: raw sends, custom requests, notifications, handlers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;
use wsmcp_protocol::{Message, Result, methods};

use crate::client::core::Client;
use crate::handlers::MessageHandler;

impl Client {
    /// Write `message` as-is.
    ///
    /// Nothing is registered for correlation; a reply to a request sent this
    /// way reaches the handler registry (or is dropped).
    pub async fn send_message(&self, message: &Message) -> Result<()> {
        let transport = self.live_transport()?;
        self.write_frame(&transport, message).await
    }

    /// Send a request and return its `result`, with the default timeout.
    ///
    /// A server `error` object comes back as
    /// [`Error::Remote`](wsmcp_protocol::Error::Remote).
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        self.request_with_timeout(method, params, self.inner.config.request_timeout)
            .await
    }

    /// Like [`request`](Self::request) with an explicit timeout.
    pub async fn request_with_timeout(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value> {
        self.round_trip(method, params, timeout)
            .await?
            .into_result()
    }

    /// Send a notification (no `id`, no reply).
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        self.send_message(&Message::notification(method, params)).await
    }

    /// Ping the server and return the round-trip time. Any correlated reply
    /// counts, including a `pong` without a result.
    pub async fn ping(&self) -> Result<Duration> {
        let started = Instant::now();
        self.round_trip(methods::PING, None, self.inner.config.request_timeout)
            .await?
            .into_result()?;
        let elapsed = started.elapsed();
        debug!(elapsed_ms = elapsed.as_millis() as u64, "pong received");
        Ok(elapsed)
    }

    /// Install `handler` for inbound messages with `method`, replacing any
    /// existing one (built-ins included).
    pub fn register_handler(
        &self,
        method: impl Into<String>,
        handler: Arc<dyn MessageHandler>,
    ) -> Option<Arc<dyn MessageHandler>> {
        self.inner.handlers.register(method, handler)
    }

    /// Remove the handler for `method`.
    pub fn unregister_handler(&self, method: &str) -> Option<Arc<dyn MessageHandler>> {
        self.inner.handlers.unregister(method)
    }

    /// Methods that currently have a handler.
    pub fn handled_methods(&self) -> Vec<String> {
        self.inner.handlers.methods()
    }
}
