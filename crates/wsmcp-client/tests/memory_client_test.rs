//! Routing and lifecycle tests with the test playing the server over an
//! in-process transport.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use wsmcp_client::{Client, ConnectionStatus, Responder, handler_fn};
use wsmcp_protocol::{Error, Message, MessageId, codec};
use wsmcp_transport::{
    MemoryConnector, MemoryListener, MemoryTransport, Transport, TransportError, TransportMessage,
};

const WAIT: Duration = Duration::from_secs(5);

fn client_with(connector: MemoryConnector) -> Client {
    Client::builder()
        .connector(Arc::new(connector))
        .request_timeout(Duration::from_secs(5))
        .build()
}

async fn connect(client: &Client, listener: &mut MemoryListener) -> MemoryTransport {
    client.connect("memory://test").await.unwrap();
    listener.accept().await.unwrap()
}

async fn read(server: &MemoryTransport) -> Message {
    let frame = tokio::time::timeout(WAIT, server.receive())
        .await
        .expect("client sent nothing")
        .unwrap()
        .unwrap();
    codec::decode(&frame.payload).unwrap()
}

async fn write(server: &MemoryTransport, message: &Message) {
    let payload = codec::encode(message).unwrap();
    server.send(TransportMessage::text(payload)).await.unwrap();
}

async fn wait_for_status(client: &Client, status: ConnectionStatus) {
    tokio::time::timeout(WAIT, async {
        while client.status() != status {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("status never became {status}"));
}

#[tokio::test]
async fn test_server_request_interleaved_with_response() {
    let (connector, mut listener) = MemoryConnector::new();
    let client = client_with(connector);

    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    client.register_handler(
        "sampling/createMessage",
        handler_fn(move |message: Message, _responder: Responder| {
            let seen_tx = seen_tx.clone();
            async move {
                let _ = seen_tx.send(message);
                Ok(())
            }
        }),
    );
    let server = connect(&client, &mut listener).await;

    let call = {
        let client = client.clone();
        tokio::spawn(async move { client.request("tools/call", Some(json!({"name": "x"}))).await })
    };
    let request = read(&server).await;
    let id = request.id.clone().unwrap();

    // A server request arrives before the response; it must not satisfy the call.
    let inbound = Message::request(MessageId::from("srv-9"), "sampling/createMessage", None);
    write(&server, &inbound).await;
    write(&server, &Message::response(id, json!({"ok": true}))).await;

    assert_eq!(call.await.unwrap().unwrap(), json!({"ok": true}));
    let seen = tokio::time::timeout(WAIT, seen_rx.recv()).await.unwrap().unwrap();
    assert_eq!(seen, inbound);
}

#[tokio::test]
async fn test_unknown_and_garbage_frames_are_dropped() {
    let (connector, mut listener) = MemoryConnector::new();
    let client = client_with(connector);
    let server = connect(&client, &mut listener).await;

    server
        .send(TransportMessage::text("{not json"))
        .await
        .unwrap();
    server.send(TransportMessage::text("[1, 2]")).await.unwrap();
    write(&server, &Message::response(MessageId::from("stray"), json!(1))).await;
    write(&server, &Message::notification("unhandled/method", None)).await;

    // Still connected and still correlating.
    let ping = {
        let client = client.clone();
        tokio::spawn(async move { client.ping().await })
    };
    let request = read(&server).await;
    assert_eq!(request.method.as_deref(), Some("ping"));
    write(&server, &Message::pong(request.id)).await;

    ping.await.unwrap().unwrap();
    assert_eq!(client.status(), ConnectionStatus::Connected);
}

#[tokio::test]
async fn test_server_error_object_surfaces_as_remote() {
    let (connector, mut listener) = MemoryConnector::new();
    let client = client_with(connector);
    let server = connect(&client, &mut listener).await;

    let call = {
        let client = client.clone();
        tokio::spawn(async move { client.request("custom/thing", None).await })
    };
    let request = read(&server).await;
    let error = wsmcp_protocol::RpcError::method_not_found("custom/thing");
    write(&server, &Message::error_response(request.id, error.clone())).await;

    match call.await.unwrap() {
        Err(Error::Remote(e)) => assert_eq!(e, error),
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_null_result_completes_request() {
    let (connector, mut listener) = MemoryConnector::new();
    let client = client_with(connector);
    let server = connect(&client, &mut listener).await;

    let call = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .request_with_timeout("custom/op", None, Duration::from_millis(500))
                .await
        })
    };
    let request = read(&server).await;
    let reply = json!({"id": request.id.unwrap(), "result": null});
    server
        .send(TransportMessage::text(reply.to_string()))
        .await
        .unwrap();

    assert_eq!(call.await.unwrap().unwrap(), Value::Null);
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test]
async fn test_id_less_ping_gets_id_less_pong() {
    let (connector, mut listener) = MemoryConnector::new();
    let client = client_with(connector);
    let server = connect(&client, &mut listener).await;

    for frame in [r#"{"method":"ping"}"#, r#"{"id":"","method":"ping"}"#] {
        server.send(TransportMessage::text(frame)).await.unwrap();
        let reply = tokio::time::timeout(WAIT, server.receive())
            .await
            .expect("no pong")
            .unwrap()
            .unwrap();
        let reply: Value = serde_json::from_slice(&reply.payload).unwrap();
        assert_eq!(reply, json!({"method": "pong"}));
    }
}

#[tokio::test]
async fn test_custom_handler_replaces_builtin_ping() {
    let (connector, mut listener) = MemoryConnector::new();
    let client = client_with(connector);
    let previous = client.register_handler(
        "ping",
        handler_fn(|message: Message, responder: Responder| async move {
            let id = message.id.unwrap_or_else(|| MessageId::from("none"));
            responder.reply(id, json!({"custom": true})).await?;
            Ok(())
        }),
    );
    assert!(previous.is_some());
    let server = connect(&client, &mut listener).await;

    write(&server, &Message::request(MessageId::from("p1"), "ping", None)).await;
    let reply = read(&server).await;
    assert_eq!(reply.id, Some(MessageId::from("p1")));
    assert_eq!(reply.result, Some(json!({"custom": true})));
}

#[tokio::test]
async fn test_builtin_handlers_do_not_reply_to_server_side_methods() {
    let (connector, mut listener) = MemoryConnector::new();
    let client = client_with(connector);
    assert_eq!(
        client.handled_methods(),
        vec!["initialize", "ping", "tools/call", "tools/list"]
    );
    let server = connect(&client, &mut listener).await;

    write(&server, &Message::request(MessageId::from("i"), "initialize", None)).await;
    write(&server, &Message::request(MessageId::from("p"), "ping", None)).await;

    // The only reply is the pong.
    let reply = read(&server).await;
    assert_eq!(reply, Message::pong(Some(MessageId::from("p"))));
    assert!(
        tokio::time::timeout(Duration::from_millis(100), server.receive())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_unregistered_ping_is_ignored() {
    let (connector, mut listener) = MemoryConnector::new();
    let client = Client::builder()
        .connector(Arc::new(connector))
        .without_default_handlers()
        .build();
    assert!(client.handled_methods().is_empty());
    let server = connect(&client, &mut listener).await;

    write(&server, &Message::request(MessageId::from("p"), "ping", None)).await;
    assert!(
        tokio::time::timeout(Duration::from_millis(100), server.receive())
            .await
            .is_err()
    );
    assert_eq!(client.status(), ConnectionStatus::Connected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_disconnect_racing_requests_never_strands_a_caller() {
    let (connector, mut listener) = MemoryConnector::new();
    let client = client_with(connector);

    for _ in 0..20 {
        let _server = connect(&client, &mut listener).await;
        let calls: Vec<_> = (0..16)
            .map(|_| {
                let client = client.clone();
                tokio::spawn(async move {
                    client
                        .request_with_timeout("slow/op", None, Duration::from_secs(30))
                        .await
                })
            })
            .collect();
        tokio::task::yield_now().await;
        client.disconnect().await.unwrap();

        for call in calls {
            let outcome = tokio::time::timeout(WAIT, call)
                .await
                .expect("request outlived the disconnect")
                .unwrap();
            assert!(
                matches!(outcome, Err(Error::ConnectionClosed | Error::NotConnected)),
                "unexpected outcome {outcome:?}"
            );
        }
        assert_eq!(client.pending_requests(), 0);
    }
}

#[tokio::test]
async fn test_connect_while_connecting_is_rejected() {
    let (connector, _listener) = MemoryConnector::new();
    let client = client_with(connector.with_dial_delay(Duration::from_millis(200)));

    let first = {
        let client = client.clone();
        tokio::spawn(async move { client.connect("memory://slow").await })
    };
    wait_for_status(&client, ConnectionStatus::Connecting).await;
    assert!(matches!(
        client.connect("memory://slow").await,
        Err(Error::AlreadyConnecting)
    ));

    first.await.unwrap().unwrap();
    assert_eq!(client.status(), ConnectionStatus::Connected);
    assert_eq!(client.connection().sessions, 1);
}

#[tokio::test]
async fn test_disconnect_during_dial_discards_the_late_transport() {
    let (connector, mut listener) = MemoryConnector::new();
    let client = client_with(connector.with_dial_delay(Duration::from_millis(100)));

    let dial = {
        let client = client.clone();
        tokio::spawn(async move { client.connect("memory://late").await })
    };
    wait_for_status(&client, ConnectionStatus::Connecting).await;
    client.disconnect().await.unwrap();
    assert_eq!(client.status(), ConnectionStatus::Disconnected);

    assert!(matches!(dial.await.unwrap(), Err(Error::Cancelled)));
    assert_eq!(client.status(), ConnectionStatus::Disconnected);
    assert_eq!(client.connection().sessions, 0);

    // The far end sees the superseded transport closed.
    let server = listener.accept().await.unwrap();
    assert!(server.receive().await.unwrap().is_none());
}

#[tokio::test]
async fn test_dial_timeout() {
    let (connector, _listener) = MemoryConnector::new();
    let client = Client::builder()
        .connector(Arc::new(connector.with_dial_delay(Duration::from_secs(5))))
        .connect_timeout(Duration::from_millis(50))
        .build();

    match client.connect("memory://never").await {
        Err(Error::Dial { url, reason }) => {
            assert_eq!(url, "memory://never");
            assert!(reason.contains("timed out"), "reason: {reason}");
        }
        other => panic!("expected dial error, got {other:?}"),
    }
    assert_eq!(client.status(), ConnectionStatus::Error);
}

#[tokio::test]
async fn test_transport_error_fails_pending_and_sets_error() {
    let (connector, mut listener) = MemoryConnector::new();
    let client = client_with(connector);
    let server = connect(&client, &mut listener).await;

    let call = {
        let client = client.clone();
        tokio::spawn(async move { client.request("slow/op", None).await })
    };
    let _request = read(&server).await;
    server
        .send_error(TransportError::ConnectionLost("reset by peer".to_owned()))
        .await
        .unwrap();

    match call.await.unwrap() {
        Err(Error::Transport(reason)) => assert!(reason.contains("reset by peer")),
        other => panic!("expected transport error, got {other:?}"),
    }
    wait_for_status(&client, ConnectionStatus::Error).await;
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test]
async fn test_peer_drop_sets_error_and_reconnect_works() {
    let (connector, mut listener) = MemoryConnector::new();
    let client = client_with(connector);
    let server = connect(&client, &mut listener).await;

    server.close().await.unwrap();
    drop(server);
    wait_for_status(&client, ConnectionStatus::Error).await;

    let server = connect(&client, &mut listener).await;
    assert_eq!(client.status(), ConnectionStatus::Connected);
    assert_eq!(client.connection().sessions, 2);

    let call = {
        let client = client.clone();
        tokio::spawn(async move { client.request("after/reconnect", None).await })
    };
    let request = read(&server).await;
    write(&server, &Message::response(request.id.unwrap(), Value::Null)).await;
    assert_eq!(call.await.unwrap().unwrap(), Value::Null);
}

#[tokio::test]
async fn test_dropping_last_client_closes_transport() {
    let (connector, mut listener) = MemoryConnector::new();
    let client = client_with(connector);
    let server = connect(&client, &mut listener).await;

    drop(client);
    let closed = tokio::time::timeout(WAIT, server.receive()).await.unwrap();
    assert!(closed.unwrap().is_none());
}
