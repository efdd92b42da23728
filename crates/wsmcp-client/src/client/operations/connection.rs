//! Connection lifecycle operations: connect, initialize, disconnect, status.

use std::sync::Arc;

use tracing::{debug, info, warn};
use wsmcp_protocol::{ClientInfo, Error, InitializeRequest, InitializeResult, Result, methods};

use crate::client::core::Client;
use crate::client::state::{Connection, ConnectionStatus, DialOutcome};

impl Client {
    /// Dial `server_url` and start the receive loop.
    ///
    /// Fails with [`Error::AlreadyConnecting`] or [`Error::AlreadyConnected`]
    /// unless the connection is `Disconnected` or `Error`. A failed or timed
    /// out dial returns [`Error::Dial`] and leaves the status at `Error`.
    pub async fn connect(&self, server_url: impl Into<String>) -> Result<()> {
        let server_url = server_url.into();
        if self.inner.shutdown.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let attempt = self.inner.state.write().begin_connect(&server_url)?;
        let connection_id = self.inner.state.read().snapshot().id;
        info!(%connection_id, server_url = %server_url, "connecting");

        let timeout = self.inner.config.connect_timeout;
        let dialed =
            match tokio::time::timeout(timeout, self.inner.connector.connect(&server_url)).await {
                Ok(Ok(transport)) => Ok(transport),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(format!("timed out after {timeout:?}")),
            };

        let transport = match dialed {
            Ok(transport) => transport,
            Err(reason) => {
                self.inner.state.write().fail_connect(attempt);
                warn!(%connection_id, server_url = %server_url, %reason, "connection failed");
                return Err(Error::Dial {
                    url: server_url,
                    reason,
                });
            }
        };

        let token = self.inner.shutdown.child_token();
        let outcome = self
            .inner
            .state
            .write()
            .establish(attempt, Arc::clone(&transport), token);
        match outcome {
            DialOutcome::Established { session, token } => {
                self.spawn_receive_loop(session, transport, token);
                info!(%connection_id, server_url = %server_url, session, "connected");
                Ok(())
            }
            DialOutcome::Superseded => {
                debug!(%connection_id, "dial finished after disconnect; dropping it");
                let _ = transport.close().await;
                Err(Error::Cancelled)
            }
        }
    }

    /// Close the connection and fail every pending request with
    /// [`Error::ConnectionClosed`]. Safe to call in any state, any number of
    /// times.
    pub async fn disconnect(&self) -> Result<()> {
        let released = self.inner.state.write().teardown();
        self.inner.correlations.fail_all(&Error::ConnectionClosed);

        if let Some(transport) = released {
            if let Err(e) = transport.close().await {
                debug!(error = %e, "ignoring close error");
            }
            info!(connection_id = %self.inner.state.read().snapshot().id, "disconnected");
        }
        Ok(())
    }

    /// Perform the `initialize` handshake.
    ///
    /// Sends the configured protocol version with empty capabilities and waits
    /// for the correlated reply. A server answering with a different protocol
    /// version is accepted and logged.
    pub async fn initialize(&self, client_info: ClientInfo) -> Result<InitializeResult> {
        let mut request = InitializeRequest::new(client_info);
        request.protocol_version.clone_from(&self.inner.config.protocol_version);
        let params = serde_json::to_value(&request).map_err(|e| Error::Encode(e.to_string()))?;

        let result: InitializeResult = self.typed_request(methods::INITIALIZE, Some(params)).await?;
        if result.protocol_version != request.protocol_version {
            warn!(
                requested = %request.protocol_version,
                negotiated = %result.protocol_version,
                "server speaks a different protocol version"
            );
        }
        info!(
            server_name = %result.server_info.name,
            server_version = %result.server_info.version,
            protocol_version = %result.protocol_version,
            "initialized"
        );
        *self.inner.server.write() = Some(result.clone());
        Ok(result)
    }

    /// Current lifecycle state.
    ///
    /// Operations other than `connect` fail fast with
    /// [`Error::NotConnected`] unless this is `Connected`:
    ///
    /// ```rust
    /// use wsmcp_client::{Client, ConnectionStatus};
    /// use wsmcp_protocol::Error;
    ///
    /// # tokio_test::block_on(async {
    /// let client = Client::websocket();
    /// assert_eq!(client.status(), ConnectionStatus::Disconnected);
    /// assert!(matches!(client.list_tools().await, Err(Error::NotConnected)));
    /// # });
    /// ```
    pub fn status(&self) -> ConnectionStatus {
        self.inner.state.read().status()
    }

    /// Snapshot of the connection record.
    pub fn connection(&self) -> Connection {
        self.inner.state.read().snapshot()
    }

    /// Whether the status is `Connected`.
    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// What the server reported in the last successful `initialize`.
    pub fn server_info(&self) -> Option<InitializeResult> {
        self.inner.server.read().clone()
    }
}
