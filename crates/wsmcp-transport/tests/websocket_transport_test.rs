//! WebSocket transport against a real socket.
//!
//! NO MOCKS: every test binds a tungstenite server on an ephemeral port and
//! drives it through the same `WebSocketTransport` the client uses.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::accept_async;
use wsmcp_transport::{
    Connector, FrameKind, Transport, TransportError, TransportMessage, WebSocketConnector,
    WebSocketTransport,
};

/// Accepts one connection and hands back the server-side transport.
async fn accept_one() -> (String, oneshot::Receiver<Arc<WebSocketTransport<TcpStream>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let (stream, peer) = listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();
        let _ = tx.send(Arc::new(WebSocketTransport::new(peer.to_string(), ws)));
    });
    (format!("ws://{addr}"), rx)
}

#[tokio::test]
async fn test_text_frames_round_trip() {
    let (url, server) = accept_one().await;
    let client = WebSocketConnector::new().connect(&url).await.unwrap();
    let server = server.await.unwrap();

    assert_eq!(client.endpoint().as_deref(), Some(url.as_str()));

    client
        .send(TransportMessage::text(r#"{"id":"1","method":"ping"}"#))
        .await
        .unwrap();
    let frame = server.receive().await.unwrap().unwrap();
    assert_eq!(frame.kind, FrameKind::Text);
    assert_eq!(frame.as_str(), Some(r#"{"id":"1","method":"ping"}"#));

    server
        .send(TransportMessage::text(r#"{"id":"1","method":"pong"}"#))
        .await
        .unwrap();
    let reply = client.receive().await.unwrap().unwrap();
    assert_eq!(reply.as_str(), Some(r#"{"id":"1","method":"pong"}"#));
}

#[tokio::test]
async fn test_send_while_receive_is_parked() {
    let (url, server) = accept_one().await;
    let client = WebSocketConnector::new().connect(&url).await.unwrap();
    let server = server.await.unwrap();

    let reader = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.receive().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Must not deadlock on the reader's lock.
    tokio::time::timeout(
        Duration::from_secs(2),
        client.send(TransportMessage::text("{}")),
    )
    .await
    .expect("send blocked behind receive")
    .unwrap();
    assert_eq!(server.receive().await.unwrap().unwrap().as_str(), Some("{}"));

    server.send(TransportMessage::text("done")).await.unwrap();
    let frame = reader.await.unwrap().unwrap().unwrap();
    assert_eq!(frame.as_str(), Some("done"));
}

#[tokio::test]
async fn test_binary_frames_pass_through() {
    let (url, server) = accept_one().await;
    let client = WebSocketConnector::new().connect(&url).await.unwrap();
    let server = server.await.unwrap();

    server
        .send(TransportMessage::binary(vec![0u8, 159, 146, 150]))
        .await
        .unwrap();
    let frame = client.receive().await.unwrap().unwrap();
    assert_eq!(frame.kind, FrameKind::Binary);
    assert_eq!(frame.payload.as_ref(), &[0u8, 159, 146, 150]);
}

#[tokio::test]
async fn test_peer_close_ends_stream() {
    let (url, server) = accept_one().await;
    let client = WebSocketConnector::new().connect(&url).await.unwrap();
    let server = server.await.unwrap();

    server.close().await.unwrap();
    let next = tokio::time::timeout(Duration::from_secs(2), client.receive())
        .await
        .unwrap()
        .unwrap();
    assert!(next.is_none());
    assert!(client.is_closed());
}

#[tokio::test]
async fn test_close_is_idempotent_and_blocks_sends() {
    let (url, _server) = accept_one().await;
    let client = WebSocketConnector::new().connect(&url).await.unwrap();

    client.close().await.unwrap();
    client.close().await.unwrap();
    assert!(client.is_closed());
    assert!(matches!(
        client.send(TransportMessage::text("{}")).await,
        Err(TransportError::Closed)
    ));
}
