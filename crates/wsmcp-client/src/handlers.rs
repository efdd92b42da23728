//! Handlers for inbound messages that are not correlated responses.
//!
//! When the server sends a request or notification, the receive loop looks up
//! a [`MessageHandler`] by method name in the [`HandlerRegistry`] and runs it
//! on its own task. Handlers answer through the [`Responder`] they are given.
//!
//! ## Built-in handlers
//!
//! | method | behaviour |
//! |---|---|
//! | `ping` | replies `{"id": <same>, "method": "pong"}` |
//! | `initialize`, `tools/list`, `tools/call` | logged at debug, no reply |
//!
//! Registering a handler for any of these methods replaces the built-in one.
//!
//! ```rust,no_run
//! use wsmcp_client::handlers::{Responder, handler_fn};
//! use wsmcp_protocol::Message;
//!
//! # fn demo(client: &wsmcp_client::Client) {
//! client.register_handler(
//!     "notifications/progress",
//!     handler_fn(|message: Message, _responder: Responder| async move {
//!         println!("progress: {:?}", message.params);
//!         Ok(())
//!     }),
//! );
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace, warn};
use wsmcp_protocol::{Codec as _, Error, JsonCodec, Message, MessageId, RpcError, methods};
use wsmcp_transport::{Transport, TransportMessage};

/// Errors a handler can report. They are logged; nothing is sent to the peer
/// unless the handler sent it.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HandlerError {
    /// Replying through the [`Responder`] failed.
    #[error("Failed to send reply: {0}")]
    Reply(#[from] Error),

    /// The handler gave up for its own reasons.
    #[error("Handler failed: {message}")]
    Failed {
        /// What went wrong
        message: String,
    },
}

impl HandlerError {
    /// A [`HandlerError::Failed`] with the given message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Result type for handler callbacks.
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Sends messages back over the connection an inbound message arrived on.
#[derive(Clone)]
pub struct Responder {
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("endpoint", &self.transport.endpoint())
            .finish()
    }
}

impl Responder {
    pub(crate) fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Send an arbitrary message.
    pub async fn send(&self, message: &Message) -> Result<(), Error> {
        let payload = JsonCodec.encode(message)?;
        self.transport
            .send(TransportMessage::text(payload))
            .await
            .map_err(Error::from)
    }

    /// Answer a request successfully.
    pub async fn reply(&self, id: MessageId, result: Value) -> Result<(), Error> {
        self.send(&Message::response(id, result)).await
    }

    /// Answer a request with an error object.
    pub async fn reply_error(&self, id: Option<MessageId>, error: RpcError) -> Result<(), Error> {
        self.send(&Message::error_response(id, error)).await
    }
}

/// Callback for one inbound method.
#[async_trait]
pub trait MessageHandler: Send + Sync + fmt::Debug {
    /// Handle a message. `responder` writes to the same connection.
    async fn handle(&self, message: Message, responder: Responder) -> HandlerResult<()>;
}

/// Adapter turning an async closure into a [`MessageHandler`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnHandler")
    }
}

#[async_trait]
impl<F, Fut> MessageHandler for FnHandler<F>
where
    F: Fn(Message, Responder) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult<()>> + Send,
{
    async fn handle(&self, message: Message, responder: Responder) -> HandlerResult<()> {
        (self.f)(message, responder).await
    }
}

/// Wrap an async closure as a handler.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn MessageHandler>
where
    F: Fn(Message, Responder) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<()>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

/// Built-in `ping` handler: echoes the id back in a `pong`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PingHandler;

#[async_trait]
impl MessageHandler for PingHandler {
    async fn handle(&self, message: Message, responder: Responder) -> HandlerResult<()> {
        debug!(id = ?message.id, "answering server ping");
        responder.send(&Message::pong(message.id)).await?;
        Ok(())
    }
}

/// Built-in handler that only records the message.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

#[async_trait]
impl MessageHandler for LoggingHandler {
    async fn handle(&self, message: Message, _responder: Responder) -> HandlerResult<()> {
        debug!(
            method = message.method_name(),
            id = ?message.id,
            has_params = message.params.is_some(),
            has_result = message.result.is_some(),
            "inbound message received"
        );
        Ok(())
    }
}

/// Method name to handler map, owned by one client.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn MessageHandler>>>,
}

impl HandlerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with the built-in handlers.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(methods::PING, Arc::new(PingHandler));
        for method in [methods::INITIALIZE, methods::TOOLS_LIST, methods::TOOLS_CALL] {
            registry.register(method, Arc::new(LoggingHandler));
        }
        registry
    }

    /// Install `handler` for `method`, returning the one it replaced.
    pub fn register(
        &self,
        method: impl Into<String>,
        handler: Arc<dyn MessageHandler>,
    ) -> Option<Arc<dyn MessageHandler>> {
        let method = method.into();
        trace!(method = %method, "handler registered");
        self.handlers.write().insert(method, handler)
    }

    /// Remove the handler for `method`.
    pub fn unregister(&self, method: &str) -> Option<Arc<dyn MessageHandler>> {
        self.handlers.write().remove(method)
    }

    /// The handler for `method`, if any.
    pub fn get(&self, method: &str) -> Option<Arc<dyn MessageHandler>> {
        self.handlers.read().get(method).cloned()
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<String> {
        let mut methods: Vec<_> = self.handlers.read().keys().cloned().collect();
        methods.sort();
        methods
    }

    /// Run the handler for `message.method` on a new task.
    ///
    /// Returns `false` (after logging) when the message has no method or no
    /// handler is registered for it. Must be called inside a tokio runtime.
    pub fn dispatch(&self, message: Message, responder: Responder) -> bool {
        let Some(method) = message.method.clone() else {
            debug!(id = ?message.id, "discarding inbound message without method");
            return false;
        };
        let Some(handler) = self.get(&method) else {
            debug!(method = %method, id = ?message.id, "no handler registered; discarding");
            return false;
        };

        trace!(method = %method, "dispatching to handler");
        tokio::spawn(async move {
            if let Err(e) = handler.handle(message, responder).await {
                warn!(method = %method, error = %e, "handler failed");
            }
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use wsmcp_transport::MemoryTransport;

    fn responder() -> (Responder, MemoryTransport) {
        let (client, server) = MemoryTransport::pair();
        (Responder::new(Arc::new(client)), server)
    }

    async fn next_message(server: &MemoryTransport) -> Message {
        let frame = tokio::time::timeout(Duration::from_secs(1), server.receive())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        wsmcp_protocol::codec::decode(&frame.payload).unwrap()
    }

    #[test]
    fn test_defaults_cover_expected_methods() {
        let registry = HandlerRegistry::with_defaults();
        assert_eq!(
            registry.methods(),
            vec!["initialize", "ping", "tools/call", "tools/list"]
        );
    }

    #[test]
    fn test_register_replaces_existing() {
        let registry = HandlerRegistry::with_defaults();
        let previous = registry.register("ping", Arc::new(LoggingHandler));
        assert!(previous.is_some());
        assert_eq!(registry.methods().len(), 4);
        assert!(registry.unregister("ping").is_some());
        assert!(registry.get("ping").is_none());
    }

    #[tokio::test]
    async fn test_default_ping_replies_with_pong() {
        let registry = HandlerRegistry::with_defaults();
        let (responder, server) = responder();

        let ping = Message::request(MessageId::from("srv-1"), "ping", None);
        assert!(registry.dispatch(ping, responder));

        assert_eq!(
            next_message(&server).await,
            Message::pong(Some(MessageId::from("srv-1")))
        );
    }

    #[tokio::test]
    async fn test_unknown_method_is_not_an_error() {
        let registry = HandlerRegistry::with_defaults();
        let (responder, _server) = responder();
        assert!(!registry.dispatch(Message::notification("custom/event", None), responder.clone()));
        assert!(!registry.dispatch(Message::response(MessageId::from("x"), Value::Null), responder));
    }

    #[tokio::test]
    async fn test_closure_handler_runs() {
        let registry = HandlerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        registry.register(
            "custom/echo",
            handler_fn(move |message: Message, responder: Responder| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    let id = message.id.ok_or_else(|| HandlerError::failed("missing id"))?;
                    responder.reply(id, serde_json::json!({"ok": true})).await?;
                    Ok(())
                }
            }),
        );

        let (responder, server) = responder();
        let request = Message::request(MessageId::from(5i64), "custom/echo", None);
        assert!(registry.dispatch(request, responder));

        let reply = next_message(&server).await;
        assert_eq!(reply.id, Some(MessageId::from(5i64)));
        assert_eq!(reply.result, Some(serde_json::json!({"ok": true})));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
