//! Transport behaviour over real WebSocket connections.

use std::sync::{Arc, Mutex};

use serde_json::json;

use notifyhub_core::config::transport::TransportConfig;
use notifyhub_core::error::ErrorKind;
use notifyhub_realtime::{ConnectionStatus, EventType, TransportConnection};

use crate::helpers::{eventually, TestServer, WAIT};

#[tokio::test]
async fn test_connects_with_encoded_token() {
    let mut server = TestServer::start().await;
    let transport = TransportConnection::new(&server.transport_config()).unwrap();

    transport.connect().await.expect("connect");
    let conn = server.accept().await;

    assert!(transport.is_connected());
    assert_eq!(conn.uri, "/ws?token=secret+token");
    transport.disconnect().await;
    assert_eq!(transport.status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_offline_sends_flush_in_order() {
    let mut server = TestServer::start().await;
    let transport = TransportConnection::new(&server.transport_config()).unwrap();

    transport.send_event("first", json!({ "n": 1 })).unwrap();
    transport.send_event("second", json!({ "n": 2 })).unwrap();
    transport.connect().await.unwrap();
    transport.send_event("third", json!({ "n": 3 })).unwrap();

    let mut conn = server.accept().await;
    for expected in ["first", "second", "third"] {
        let msg = conn.next_message().await;
        assert_eq!(msg["type"], expected);
        assert!(msg["messageId"].is_string());
    }
    transport.disconnect().await;
}

#[tokio::test]
async fn test_inbound_envelopes_reach_handlers_in_order() {
    let mut server = TestServer::start().await;
    let transport = TransportConnection::new(&server.transport_config()).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    transport.on(EventType::from("chat"), move |env| {
        s.lock().unwrap().push(env.data["n"].as_i64().unwrap_or_default());
        Ok(())
    });

    transport.connect().await.unwrap();
    let mut conn = server.accept().await;
    for n in 1..=5 {
        conn.push("chat", json!({ "n": n })).await;
    }

    assert!(eventually(|| seen.lock().unwrap().len() == 5).await);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4, 5]);
    transport.disconnect().await;
}

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let mut server = TestServer::start().await;
    let transport = TransportConnection::new(&server.transport_config()).unwrap();
    transport.connect().await.unwrap();

    let first = server.accept().await;
    first.close().await;

    let mut second = server.accept().await;
    assert!(eventually(|| transport.is_connected()).await);
    assert_eq!(transport.stats().await.unwrap().reconnect_attempts, 0);

    transport.send_event("after_reconnect", json!({})).unwrap();
    assert_eq!(second.next_message().await["type"], "after_reconnect");
    transport.disconnect().await;
}

#[tokio::test]
async fn test_unreachable_server_reports_error_then_gives_up() {
    // Bind then release a port so nothing is listening on it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = TransportConfig::new(format!("ws://{addr}/ws"));
    config.max_reconnect_attempts = 2;
    config.reconnect_delay_ms = 10;
    config.max_reconnect_delay_ms = 20;
    let transport = TransportConnection::new(&config).unwrap();

    let err = transport.connect().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Connection);
    assert_eq!(transport.status(), ConnectionStatus::Error);

    let mut gave_up = false;
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        let stats = transport.stats().await.unwrap();
        if !stats.reconnect_pending && stats.reconnect_attempts >= 2 {
            gave_up = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(gave_up, "reconnect attempts never ran out");
    assert_eq!(transport.status(), ConnectionStatus::Error);
}
