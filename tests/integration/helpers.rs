//! Shared test helpers for integration tests.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use notifyhub_core::config::transport::TransportConfig;

/// Upper bound for any single wait in these tests.
pub const WAIT: Duration = Duration::from_secs(5);

/// Local WebSocket server accepting any number of connections
pub struct TestServer {
    /// Endpoint clients should connect to
    pub url: String,
    /// Accepted connections, in order
    connections: mpsc::UnboundedReceiver<ServerConn>,
    accept_task: JoinHandle<()>,
}

impl TestServer {
    /// Bind to an ephemeral port and start accepting
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let (tx, connections) = mpsc::unbounded_channel();

        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let mut uri = String::new();
                let ws = tokio_tungstenite::accept_hdr_async(
                    stream,
                    |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                        uri = req.uri().to_string();
                        Ok(resp)
                    },
                )
                .await;
                if let Ok(ws) = ws {
                    if tx.send(ServerConn { ws, uri }).is_err() {
                        break;
                    }
                }
            }
        });

        Self {
            url: format!("ws://{addr}/ws"),
            connections,
            accept_task,
        }
    }

    /// Transport settings pointing at this server with short retry delays
    pub fn transport_config(&self) -> TransportConfig {
        let mut config = TransportConfig::new(self.url.clone()).with_token("secret token");
        config.reconnect_delay_ms = 20;
        config.max_reconnect_delay_ms = 100;
        config
    }

    /// Wait for the next client connection
    pub async fn accept(&mut self) -> ServerConn {
        tokio::time::timeout(WAIT, self.connections.recv())
            .await
            .expect("Timed out waiting for a client connection")
            .expect("Accept loop stopped")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

/// Server side of one accepted connection
pub struct ServerConn {
    ws: WebSocketStream<TcpStream>,
    /// Request target of the upgrade, including the query
    pub uri: String,
}

impl ServerConn {
    /// Send an envelope built from a type and payload
    pub async fn push(&mut self, event_type: &str, data: Value) {
        let envelope = serde_json::json!({
            "type": event_type,
            "data": data,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        self.ws
            .send(Message::text(envelope.to_string()))
            .await
            .expect("Failed to push envelope");
    }

    /// Next non-heartbeat envelope from the client as JSON
    pub async fn next_message(&mut self) -> Value {
        loop {
            let frame = tokio::time::timeout(WAIT, self.ws.next())
                .await
                .expect("Timed out waiting for a client frame")
                .expect("Client closed the connection")
                .expect("WebSocket read failed");
            let Message::Text(text) = frame else {
                continue;
            };
            let value: Value = serde_json::from_str(text.as_str()).expect("Client sent bad JSON");
            if value["type"] != "heartbeat" {
                return value;
            }
        }
    }

    /// Close from the server side
    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}

/// Poll `done` until it holds or [`WAIT`] elapses
pub async fn eventually(mut done: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if done() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    done()
}
