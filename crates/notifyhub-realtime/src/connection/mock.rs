//! Scripted in-memory connector for exercising the state machine.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;

use notifyhub_core::{AppError, AppResult};

use super::connector::{Connector, Socket};
use crate::message::{serializer, Envelope, EventType};

/// Connector whose outcomes are scripted by the test.
pub(crate) struct MockConnector {
    /// Outcomes for upcoming attempts; `true` accepts. Empty means accept.
    script: Mutex<VecDeque<bool>>,
    /// Refuse every attempt once the script is exhausted.
    refuse_all: AtomicBool,
    /// Never complete the handshake.
    hang: AtomicBool,
    /// How long each handshake takes before its outcome is known.
    latency: Mutex<Duration>,
    /// When each attempt was made.
    attempts: Mutex<Vec<Instant>>,
    /// Test-side ends of accepted connections.
    peers: mpsc::UnboundedSender<MockPeer>,
}

impl MockConnector {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockPeer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            refuse_all: AtomicBool::new(false),
            hang: AtomicBool::new(false),
            latency: Mutex::new(Duration::ZERO),
            attempts: Mutex::new(Vec::new()),
            peers: tx,
        });
        (connector, rx)
    }

    pub(crate) fn script(&self, outcomes: &[bool]) {
        self.script.lock().unwrap().extend(outcomes.iter().copied());
    }

    pub(crate) fn refuse_all(&self, refuse: bool) {
        self.refuse_all.store(refuse, Ordering::SeqCst);
    }

    pub(crate) fn hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    pub(crate) fn latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub(crate) fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub(crate) fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _url: &str) -> AppResult<Box<dyn Socket>> {
        self.attempts.lock().unwrap().push(Instant::now());

        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let accept = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(!self.refuse_all.load(Ordering::SeqCst));
        if !accept {
            return Err(AppError::connection("connection refused"));
        }

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let fail_sends = Arc::new(AtomicBool::new(false));
        let _ = self.peers.send(MockPeer {
            sent: out_rx,
            inbound: in_tx,
            fail_sends: fail_sends.clone(),
        });
        Ok(Box::new(MockSocket {
            outbound: out_tx,
            inbound: in_rx,
            fail_sends,
        }))
    }
}

struct MockSocket {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<AppResult<String>>,
    fail_sends: Arc<AtomicBool>,
}

#[async_trait]
impl Socket for MockSocket {
    async fn send_text(&mut self, text: String) -> AppResult<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(AppError::transport("write failed"));
        }
        self.outbound
            .send(text)
            .map_err(|_| AppError::transport("peer gone"))
    }

    async fn next_text(&mut self) -> Option<AppResult<String>> {
        self.inbound.recv().await
    }

    async fn close(&mut self) {
        self.inbound.close();
    }
}

/// Server side of one mock connection. Dropping it closes the connection.
pub(crate) struct MockPeer {
    sent: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<AppResult<String>>,
    fail_sends: Arc<AtomicBool>,
}

impl MockPeer {
    pub(crate) fn push(&self, envelope: &Envelope) {
        let text = serializer::encode(envelope).unwrap();
        self.inbound.send(Ok(text)).unwrap();
    }

    pub(crate) fn push_raw(&self, text: &str) {
        self.inbound.send(Ok(text.to_string())).unwrap();
    }

    pub(crate) fn fail(&self, message: &str) {
        self.inbound
            .send(Err(AppError::transport(message.to_string())))
            .unwrap();
    }

    pub(crate) fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Next frame written by the client, heartbeats included.
    pub(crate) async fn next_frame(&mut self) -> Option<Envelope> {
        let text = self.sent.recv().await?;
        Some(serializer::decode(&text).unwrap())
    }

    /// Next non-heartbeat frame written by the client.
    pub(crate) async fn next_message(&mut self) -> Option<Envelope> {
        loop {
            let envelope = self.next_frame().await?;
            if envelope.event_type != EventType::Heartbeat {
                return Some(envelope);
            }
        }
    }

    /// Frames already written, without waiting.
    pub(crate) fn drain(&mut self) -> Vec<Envelope> {
        let mut out = Vec::new();
        while let Ok(text) = self.sent.try_recv() {
            out.push(serializer::decode(&text).unwrap());
        }
        out
    }
}
