//! In-process transport.
//!
//! [`MemoryTransport::pair`] returns two connected ends backed by unbounded
//! channels. [`MemoryConnector`] hands the far end of every dial to a
//! [`MemoryListener`], which lets tests play the server without a socket.
//!
//! ```rust
//! use wsmcp_transport::{MemoryTransport, Transport, TransportMessage};
//!
//! # tokio_test::block_on(async {
//! let (client, server) = MemoryTransport::pair();
//! client.send(TransportMessage::text("hello")).await.unwrap();
//! let frame = server.receive().await.unwrap().unwrap();
//! assert_eq!(frame.as_str(), Some("hello"));
//!
//! client.close().await.unwrap();
//! assert!(server.receive().await.unwrap().is_none());
//! # });
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::{
    Connector, Transport, TransportError, TransportMessage, TransportResult, TransportType,
};

type Frame = TransportResult<TransportMessage>;

/// One end of an in-process connection.
#[derive(Debug)]
pub struct MemoryTransport {
    endpoint: String,
    outbound: Mutex<Option<mpsc::UnboundedSender<Frame>>>,
    inbound: Mutex<mpsc::UnboundedReceiver<Frame>>,
    shutdown: CancellationToken,
    peer_gone: AtomicBool,
}

impl MemoryTransport {
    /// Two connected ends.
    pub fn pair() -> (Self, Self) {
        Self::pair_for("memory://pair")
    }

    fn pair_for(endpoint: &str) -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (Self::new(endpoint, a_tx, b_rx), Self::new(endpoint, b_tx, a_rx))
    }

    fn new(
        endpoint: &str,
        outbound: mpsc::UnboundedSender<Frame>,
        inbound: mpsc::UnboundedReceiver<Frame>,
    ) -> Self {
        Self {
            endpoint: endpoint.to_owned(),
            outbound: Mutex::new(Some(outbound)),
            inbound: Mutex::new(inbound),
            shutdown: CancellationToken::new(),
            peer_gone: AtomicBool::new(false),
        }
    }

    /// Make the peer's next `receive` fail with `error`.
    pub async fn send_error(&self, error: TransportError) -> TransportResult<()> {
        self.push(Err(error)).await
    }

    async fn push(&self, frame: Frame) -> TransportResult<()> {
        let outbound = self.outbound.lock().await;
        let tx = outbound.as_ref().ok_or(TransportError::Closed)?;
        tx.send(frame)
            .map_err(|_| TransportError::ConnectionLost("peer dropped".to_owned()))
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::Memory
    }

    fn endpoint(&self) -> Option<String> {
        Some(self.endpoint.clone())
    }

    async fn send(&self, message: TransportMessage) -> TransportResult<()> {
        trace!(endpoint = %self.endpoint, size = message.size(), "memory frame sent");
        self.push(Ok(message)).await
    }

    async fn receive(&self) -> TransportResult<Option<TransportMessage>> {
        if self.shutdown.is_cancelled() {
            return Ok(None);
        }
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => Ok(None),
            frame = inbound.recv() => match frame {
                Some(frame) => frame.map(Some),
                None => {
                    self.peer_gone.store(true, Ordering::SeqCst);
                    Ok(None)
                }
            },
        }
    }

    async fn close(&self) -> TransportResult<()> {
        self.shutdown.cancel();
        // Dropping the sender ends the peer's receive stream.
        self.outbound.lock().await.take();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.peer_gone.load(Ordering::SeqCst)
    }
}

/// Server side of a [`MemoryConnector`].
#[derive(Debug)]
pub struct MemoryListener {
    accepted: mpsc::UnboundedReceiver<MemoryTransport>,
}

impl MemoryListener {
    /// Wait for the next dial. `None` once every connector is dropped.
    pub async fn accept(&mut self) -> Option<MemoryTransport> {
        self.accepted.recv().await
    }
}

/// Connector producing [`MemoryTransport`]s.
///
/// Dialing fails with [`TransportError::ConnectionFailed`] once the
/// listener is dropped.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    listener: mpsc::UnboundedSender<MemoryTransport>,
    dial_delay: Duration,
}

impl MemoryConnector {
    /// A connector and the listener receiving its dials.
    pub fn new() -> (Self, MemoryListener) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                listener: tx,
                dial_delay: Duration::ZERO,
            },
            MemoryListener { accepted: rx },
        )
    }

    /// Sleep this long inside every `connect`.
    #[must_use]
    pub fn with_dial_delay(mut self, delay: Duration) -> Self {
        self.dial_delay = delay;
        self
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    fn transport_type(&self) -> TransportType {
        TransportType::Memory
    }

    async fn connect(&self, url: &str) -> TransportResult<Arc<dyn Transport>> {
        if !self.dial_delay.is_zero() {
            tokio::time::sleep(self.dial_delay).await;
        }
        let (client, server) = MemoryTransport::pair_for(url);
        self.listener
            .send(server)
            .map_err(|_| TransportError::ConnectionFailed(format!("nothing listening on {url}")))?;
        Ok(Arc::new(client))
    }
}
