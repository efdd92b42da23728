//! Listener and per-connection loop.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wsmcp_protocol::{Message, codec};
use wsmcp_transport::{Transport, TransportMessage, WebSocketTransport};

use crate::tools::respond;

type ServerTransport = WebSocketTransport<TcpStream>;

/// Something the test wants every open connection to do.
#[derive(Debug, Clone)]
enum Command {
    Push(Message),
    Close,
}

#[derive(Debug)]
struct Shared {
    commands: broadcast::Sender<Command>,
    received: broadcast::Sender<Message>,
    connections: AtomicUsize,
}

/// A running server.
#[derive(Debug)]
pub struct TestServer {
    addr: SocketAddr,
    shared: Arc<Shared>,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start on an ephemeral port on 127.0.0.1.
    pub async fn start() -> io::Result<Self> {
        Self::bind("127.0.0.1:0").await
    }

    /// Start on `addr`.
    pub async fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let shared = Arc::new(Shared {
            commands: broadcast::channel(64).0,
            received: broadcast::channel(256).0,
            connections: AtomicUsize::new(0),
        });
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&shared),
            shutdown.clone(),
        ));
        info!(%addr, "test server listening");

        Ok(Self {
            addr,
            shared,
            shutdown,
            handle,
        })
    }

    /// Bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `ws://` URL clients should dial.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Open connections right now.
    pub fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    /// Poll until exactly `n` connections are open, giving up after `timeout`.
    pub async fn wait_for_connections(&self, n: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.connections() != n {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        true
    }

    /// Send `message` to every open connection. Returns how many got it.
    pub fn push(&self, message: Message) -> usize {
        self.shared.commands.send(Command::Push(message)).unwrap_or(0)
    }

    /// Close every open connection from the server side. The listener keeps
    /// accepting new ones.
    pub fn close_connections(&self) -> usize {
        self.shared.commands.send(Command::Close).unwrap_or(0)
    }

    /// Stream of every message clients send from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.shared.received.subscribe()
    }

    /// Token that stops the server when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Wait until the server stops.
    pub async fn wait(self) {
        let _ = self.handle.await;
    }

    /// Stop accepting and close every connection.
    pub async fn stop(self) {
        self.shutdown.cancel();
        let _ = self.handle.await;
        info!(addr = %self.addr, "test server stopped");
    }
}

async fn accept_loop(listener: TcpListener, shared: Arc<Shared>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(serve_connection(
                        stream,
                        peer,
                        Arc::clone(&shared),
                        shutdown.child_token(),
                    ));
                }
                Err(e) => warn!(error = %e, "accept failed"),
            },
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    shared: Arc<Shared>,
    shutdown: CancellationToken,
) {
    // Subscribe before the handshake so nothing pushed after the client sees
    // the upgrade can be missed.
    let mut commands = shared.commands.subscribe();
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer, error = %e, "WebSocket handshake failed");
            return;
        }
    };
    let transport = Arc::new(WebSocketTransport::new(peer.to_string(), ws));
    shared.connections.fetch_add(1, Ordering::SeqCst);
    info!(%peer, "client connected");

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            command = commands.recv() => match command {
                Ok(Command::Push(message)) => send(&transport, &message).await,
                Ok(Command::Close) | Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(%peer, skipped = n, "dropped queued commands");
                }
            },
            frame = transport.receive() => match frame {
                Ok(Some(frame)) => handle_frame(&transport, &shared, &frame),
                Ok(None) => break,
                Err(e) => {
                    warn!(%peer, error = %e, "read failed");
                    break;
                }
            },
        }
    }

    shared.connections.fetch_sub(1, Ordering::SeqCst);
    let _ = transport.close().await;
    info!(%peer, "client disconnected");
}

fn handle_frame(transport: &Arc<ServerTransport>, shared: &Shared, frame: &TransportMessage) {
    let message = match codec::decode(&frame.payload) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "undecodable frame");
            return;
        }
    };
    debug!(method = message.method_name(), id = ?message.id, "received");
    let _ = shared.received.send(message.clone());

    let transport = Arc::clone(transport);
    tokio::spawn(async move {
        if let Some(reply) = respond(&message).await {
            send(&transport, &reply).await;
        }
    });
}

async fn send(transport: &ServerTransport, message: &Message) {
    let payload = match codec::encode(message) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "failed to encode reply");
            return;
        }
    };
    if let Err(e) = transport.send(TransportMessage::text(payload)).await {
        warn!(error = %e, "failed to send");
    }
}
