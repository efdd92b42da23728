//! WebSocket transport over tokio-tungstenite.
//!
//! The stream is split once at construction: the sink and the source sit
//! behind separate locks so a sender never waits on the task parked in
//! [`Transport::receive`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt as _, StreamExt as _};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};
use url::Url;

use crate::{
    Connector, FrameKind, Transport, TransportError, TransportMessage, TransportResult,
    TransportType,
};

/// Byte stream under a client-side WebSocket (plain TCP or TLS).
pub type ClientStream = MaybeTlsStream<TcpStream>;

/// One WebSocket connection.
///
/// Generic over the underlying byte stream so accepted server-side sockets
/// can use the same framing as dialed client sockets.
pub struct WebSocketTransport<S = ClientStream> {
    endpoint: String,
    writer: Mutex<SplitSink<WebSocketStream<S>, Message>>,
    reader: Mutex<SplitStream<WebSocketStream<S>>>,
    close_sent: AtomicBool,
    peer_closed: AtomicBool,
}

impl<S> WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap an established WebSocket stream.
    pub fn new(endpoint: impl Into<String>, stream: WebSocketStream<S>) -> Self {
        let (writer, reader) = stream.split();
        Self {
            endpoint: endpoint.into(),
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            close_sent: AtomicBool::new(false),
            peer_closed: AtomicBool::new(false),
        }
    }

    fn mark_peer_closed(&self) {
        self.peer_closed.store(true, Ordering::SeqCst);
    }
}

impl<S> fmt::Debug for WebSocketTransport<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("endpoint", &self.endpoint)
            .field("close_sent", &self.close_sent.load(Ordering::Relaxed))
            .field("peer_closed", &self.peer_closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S> Transport for WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn transport_type(&self) -> TransportType {
        TransportType::WebSocket
    }

    fn endpoint(&self) -> Option<String> {
        Some(self.endpoint.clone())
    }

    async fn send(&self, message: TransportMessage) -> TransportResult<()> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let frame = match message.kind {
            FrameKind::Text => {
                let text = String::from_utf8(message.payload.to_vec())
                    .map_err(|e| TransportError::SendFailed(e.to_string()))?;
                Message::Text(text.into())
            }
            FrameKind::Binary => Message::Binary(message.payload),
        };

        let mut writer = self.writer.lock().await;
        writer
            .send(frame)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        trace!(endpoint = %self.endpoint, "frame sent");
        Ok(())
    }

    async fn receive(&self) -> TransportResult<Option<TransportMessage>> {
        if self.peer_closed.load(Ordering::SeqCst) {
            return Ok(None);
        }

        let mut reader = self.reader.lock().await;
        loop {
            match reader.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(TransportMessage::text(Bytes::from(text))));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(TransportMessage::binary(data)));
                }
                // tungstenite queues the pong itself and flushes it on the next read or write.
                Some(Ok(Message::Ping(_))) => trace!(endpoint = %self.endpoint, "ping received"),
                Some(Ok(Message::Pong(_))) => trace!(endpoint = %self.endpoint, "pong received"),
                Some(Ok(Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    debug!(endpoint = %self.endpoint, ?frame, "peer closed WebSocket");
                    self.mark_peer_closed();
                    return Ok(None);
                }
                Some(Err(
                    tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed,
                ))
                | None => {
                    self.mark_peer_closed();
                    return Ok(None);
                }
                Some(Err(e)) => {
                    self.mark_peer_closed();
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
            }
        }
    }

    async fn close(&self) -> TransportResult<()> {
        if self.close_sent.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut writer = self.writer.lock().await;
        // The peer may already be gone; a failed close handshake is not an error.
        if let Err(e) = writer.send(Message::Close(None)).await {
            debug!(endpoint = %self.endpoint, error = %e, "close frame not delivered");
        }
        if let Err(e) = writer.close().await {
            debug!(endpoint = %self.endpoint, error = %e, "sink close failed");
        }
        debug!(endpoint = %self.endpoint, "WebSocket closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.close_sent.load(Ordering::SeqCst) || self.peer_closed.load(Ordering::SeqCst)
    }
}

/// Check that `url` parses and names a WebSocket endpoint.
pub fn validate_url(url: &str) -> TransportResult<Url> {
    let parsed = Url::parse(url).map_err(|e| TransportError::InvalidUrl(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed),
        other => Err(TransportError::InvalidUrl(format!(
            "{url}: unsupported scheme '{other}', expected ws or wss"
        ))),
    }
}

/// Dials [`WebSocketTransport`]s.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Create a connector.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    fn transport_type(&self) -> TransportType {
        TransportType::WebSocket
    }

    async fn connect(&self, url: &str) -> TransportResult<Arc<dyn Transport>> {
        let parsed = validate_url(url)?;
        let (stream, response) = connect_async(parsed.as_str())
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        debug!(url, status = %response.status(), "WebSocket handshake complete");
        Ok(Arc::new(WebSocketTransport::new(url, stream)))
    }
}
