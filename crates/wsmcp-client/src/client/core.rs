//! Core `Client` implementation.
//!
//! `Client` is a cheaply-cloneable handle around an `Arc<ClientInner>`. All
//! clones share one connection record, one correlation table and one handler
//! registry. Each piece of shared state sits behind its own lock:
//!
//! - **`RwLock<ConnectionState>`**: lifecycle; reads take the shared lock
//! - **`CorrelationTable`**: its own mutex over the pending map
//! - **`HandlerRegistry`**: its own `RwLock` over the method map
//!
//! None of these locks is held across an await.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wsmcp_protocol::{Codec as _, Error, InitializeResult, JsonCodec, Message, MessageId, Result};
use wsmcp_transport::{Connector, Transport, TransportMessage, WebSocketConnector};

use super::builder::ClientBuilder;
use super::config::ClientConfig;
use super::correlation::CorrelationTable;
use super::dispatcher::{LoopExit, ReceiveLoop};
use super::state::ConnectionState;
use crate::handlers::HandlerRegistry;

pub(super) struct ClientInner {
    pub(super) config: ClientConfig,
    pub(super) connector: Arc<dyn Connector>,
    pub(super) state: RwLock<ConnectionState>,
    pub(super) correlations: Arc<CorrelationTable>,
    pub(super) handlers: Arc<HandlerRegistry>,
    pub(super) server: RwLock<Option<InitializeResult>>,
    pub(super) shutdown: CancellationToken,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        // Last handle gone: stop any receive loop still running.
        debug!("last Client reference dropped; shutting down");
        self.shutdown.cancel();
    }
}

/// MCP client engine for one server connection.
///
/// ```rust,no_run
/// use wsmcp_client::Client;
/// use wsmcp_protocol::{ClientInfo, ToolCall};
///
/// # async fn example() -> wsmcp_protocol::Result<()> {
/// let client = Client::websocket();
/// client.connect("ws://localhost:3000").await?;
///
/// let init = client.initialize(ClientInfo::new("my-app", "1.0.0")).await?;
/// println!("connected to {}", init.server_info.name);
///
/// for tool in client.list_tools().await? {
///     println!("tool: {}", tool.name);
/// }
///
/// let result = client
///     .call_tool(ToolCall::new("echo").with_argument("message", "hi"))
///     .await?;
/// println!("{}", result.joined_text());
///
/// client.disconnect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    pub(super) inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Client")
            .field("connection", &state.snapshot())
            .field("transport", &self.inner.connector.transport_type())
            .field("pending_requests", &self.inner.correlations.len())
            .finish()
    }
}

impl Client {
    /// Client dialing through `connector`, with default configuration.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self::with_config(connector, ClientConfig::default())
    }

    /// Client dialing through `connector`.
    pub fn with_config(connector: Arc<dyn Connector>, config: ClientConfig) -> Self {
        Self::from_parts(connector, config, HandlerRegistry::with_defaults())
    }

    /// WebSocket client with default configuration.
    pub fn websocket() -> Self {
        Self::new(Arc::new(WebSocketConnector::new()))
    }

    /// Start building a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(super) fn from_parts(
        connector: Arc<dyn Connector>,
        config: ClientConfig,
        handlers: HandlerRegistry,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                connector,
                state: RwLock::new(ConnectionState::new()),
                correlations: Arc::new(CorrelationTable::new()),
                handlers: Arc::new(handlers),
                server: RwLock::new(None),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Token observed by every receive loop of this client. Cancelling it
    /// disconnects and makes later `connect` calls fail with `Cancelled`.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }

    /// Number of requests waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.inner.correlations.len()
    }

    pub(super) fn live_transport(&self) -> Result<Arc<dyn Transport>> {
        self.inner.state.read().transport()
    }

    pub(super) async fn write_frame(
        &self,
        transport: &Arc<dyn Transport>,
        message: &Message,
    ) -> Result<()> {
        let payload = JsonCodec.encode(message)?;
        transport.send(TransportMessage::text(payload)).await?;
        Ok(())
    }

    /// Send a request and wait for its correlated reply.
    pub(super) async fn round_trip(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Message> {
        let transport = self.live_transport()?;
        let id = MessageId::new_v4();
        // Registered before the write so a fast reply cannot miss its waiter.
        let waiter = self.inner.correlations.register(id.clone(), method)?;

        // A disconnect that ran between taking the transport and registering
        // drained the table before this entry existed.
        let still_current = self
            .live_transport()
            .is_ok_and(|current| Arc::ptr_eq(&current, &transport));
        if !still_current {
            self.inner.correlations.fail(&id, Error::ConnectionClosed);
            return waiter.wait(timeout).await;
        }

        let request = Message::request(id.clone(), method, params);
        debug!(id = %waiter.id(), method, "sending request");
        if let Err(e) = self.write_frame(&transport, &request).await {
            self.inner.correlations.fail(&id, e.clone());
        }
        waiter.wait(timeout).await
    }

    pub(super) async fn typed_request<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<R> {
        let value = self
            .round_trip(method, params, self.inner.config.request_timeout)
            .await?
            .into_result()?;
        serde_json::from_value(value)
            .map_err(|e| Error::Decode(format!("invalid {method} result: {e}")))
    }

    pub(super) fn spawn_receive_loop(
        &self,
        session: u64,
        transport: Arc<dyn Transport>,
        token: CancellationToken,
    ) {
        let receive_loop = ReceiveLoop {
            session,
            transport,
            correlations: Arc::clone(&self.inner.correlations),
            handlers: Arc::clone(&self.inner.handlers),
            token,
        };
        let inner = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let exit = receive_loop.run().await;
            finish_session(&inner, session, exit, &receive_loop.transport).await;
        });
    }
}

/// Apply the receive loop's exit to the connection it served.
async fn finish_session(
    inner: &Weak<ClientInner>,
    session: u64,
    exit: LoopExit,
    transport: &Arc<dyn Transport>,
) {
    let Some(inner) = inner.upgrade() else {
        // Client dropped; nothing left to update.
        let _ = transport.close().await;
        return;
    };

    let (released, error) = {
        let mut state = inner.state.write();
        if !state.is_current(session) {
            // Disconnected on purpose, or already replaced by a newer session.
            return;
        }
        match &exit {
            LoopExit::Cancelled => {
                info!(session, "shutdown requested; closing connection");
                (state.teardown(), Error::ConnectionClosed)
            }
            LoopExit::Closed => {
                warn!(session, "server closed the connection");
                (state.fail_session(session), Error::ConnectionClosed)
            }
            LoopExit::Failed(e) => {
                error!(session, error = %e, "transport failed");
                (state.fail_session(session), Error::from(e.clone()))
            }
        }
    };

    inner.correlations.fail_all(&error);
    if let Some(transport) = released {
        let _ = transport.close().await;
    }
}
