//! Builder for [`Client`].

use std::sync::Arc;
use std::time::Duration;

use wsmcp_transport::{Connector, WebSocketConnector};

use super::config::ClientConfig;
use super::core::Client;
use crate::handlers::{HandlerRegistry, MessageHandler};

/// Step-by-step [`Client`] construction.
///
/// ```rust
/// use std::time::Duration;
/// use wsmcp_client::Client;
///
/// let client = Client::builder()
///     .request_timeout(Duration::from_secs(5))
///     .connect_timeout(Duration::from_secs(2))
///     .build();
/// assert_eq!(client.config().request_timeout, Duration::from_secs(5));
/// ```
#[derive(Debug)]
pub struct ClientBuilder {
    config: ClientConfig,
    connector: Option<Arc<dyn Connector>>,
    handlers: HandlerRegistry,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Defaults: WebSocket connector, [`ClientConfig::default`], built-in handlers.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            connector: None,
            handlers: HandlerRegistry::with_defaults(),
        }
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Per-request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Dial timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Protocol revision announced in `initialize`.
    #[must_use]
    pub fn protocol_version(mut self, version: impl Into<String>) -> Self {
        self.config.protocol_version = version.into();
        self
    }

    /// Dial through `connector` instead of WebSocket.
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Install a handler before the client exists.
    #[must_use]
    pub fn handler(self, method: impl Into<String>, handler: Arc<dyn MessageHandler>) -> Self {
        self.handlers.register(method, handler);
        self
    }

    /// Drop the built-in handlers, starting from an empty registry.
    #[must_use]
    pub fn without_default_handlers(mut self) -> Self {
        self.handlers = HandlerRegistry::new();
        self
    }

    /// Finish.
    pub fn build(self) -> Client {
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WebSocketConnector::new()));
        Client::from_parts(connector, self.config, self.handlers)
    }
}
