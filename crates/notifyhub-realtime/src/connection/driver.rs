//! Connection state machine.
//!
//! A single task owns the socket, the outbound queue and both timers.
//! Callers talk to it through [`Command`]s, so every transition runs to
//! completion before the next command, frame or timer is looked at.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use notifyhub_core::{AppError, AppResult};

use crate::dispatch::EventDispatcher;
use crate::message::serializer;
use crate::message::{ConnectionStatus, Envelope};

use super::backoff::ReconnectPolicy;
use super::connector::{Connector, Socket};
use super::transport::TransportStats;

/// Requests from transport handles.
pub(crate) enum Command {
    Connect(oneshot::Sender<AppResult<()>>),
    Disconnect(oneshot::Sender<()>),
    Send(Envelope),
    Stats(oneshot::Sender<TransportStats>),
}

/// Everything the loop can wake up for.
enum Event {
    Command(Command),
    Shutdown,
    Established(AppResult<Box<dyn Socket>>),
    Frame(Option<AppResult<String>>),
    ReconnectDue,
    HeartbeatDue,
}

type Establishing = BoxFuture<'static, AppResult<Box<dyn Socket>>>;

/// Static settings handed to the driver.
pub(crate) struct DriverSettings {
    pub url: String,
    pub endpoint: String,
    pub policy: ReconnectPolicy,
    pub heartbeat_interval: Duration,
    pub max_queue_size: Option<usize>,
}

pub(crate) struct Driver {
    settings: DriverSettings,
    connector: Arc<dyn Connector>,
    dispatcher: Arc<EventDispatcher>,
    status_tx: watch::Sender<ConnectionStatus>,
    commands: mpsc::UnboundedReceiver<Command>,

    status: ConnectionStatus,
    socket: Option<Box<dyn Socket>>,
    establishing: Option<Establishing>,
    waiters: Vec<oneshot::Sender<AppResult<()>>>,
    queue: VecDeque<Envelope>,
    attempts: u32,
    intentional_close: bool,
    reconnect_at: Option<Instant>,
    heartbeat: Option<Interval>,
}

impl Driver {
    pub(crate) fn new(
        settings: DriverSettings,
        connector: Arc<dyn Connector>,
        dispatcher: Arc<EventDispatcher>,
        status_tx: watch::Sender<ConnectionStatus>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        Self {
            settings,
            connector,
            dispatcher,
            status_tx,
            commands,
            status: ConnectionStatus::Disconnected,
            socket: None,
            establishing: None,
            waiters: Vec::new(),
            queue: VecDeque::new(),
            attempts: 0,
            intentional_close: false,
            reconnect_at: None,
            heartbeat: None,
        }
    }

    /// Run until every transport handle has been dropped.
    pub(crate) async fn run(mut self) {
        loop {
            let event = tokio::select! {
                // Commands first: a disconnect must win over a timer that
                // became due in the same poll.
                biased;
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => Event::Command(cmd),
                    None => Event::Shutdown,
                },
                result = establish(&mut self.establishing) => Event::Established(result),
                frame = next_frame(&mut self.socket) => Event::Frame(frame),
                () = sleep_until(self.reconnect_at) => Event::ReconnectDue,
                () = tick(&mut self.heartbeat) => Event::HeartbeatDue,
            };

            match event {
                Event::Command(cmd) => self.on_command(cmd).await,
                Event::Shutdown => {
                    self.disconnect().await;
                    break;
                }
                Event::Established(result) => {
                    self.establishing = None;
                    self.on_established(result).await;
                }
                Event::Frame(Some(Ok(text))) => self.on_text(&text),
                Event::Frame(Some(Err(e))) => self.on_closed(Some(e)),
                Event::Frame(None) => self.on_closed(None),
                Event::ReconnectDue => {
                    self.reconnect_at = None;
                    self.begin_attempt();
                }
                Event::HeartbeatDue => self.on_heartbeat().await,
            }
        }

        tracing::debug!("Transport driver for {} stopped", self.settings.endpoint);
    }

    async fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect(reply) => self.connect(reply),
            Command::Disconnect(reply) => {
                self.disconnect().await;
                let _ = reply.send(());
            }
            Command::Send(envelope) => {
                self.enqueue(envelope);
                if self.status == ConnectionStatus::Connected {
                    self.flush_queue().await;
                }
            }
            Command::Stats(reply) => {
                let _ = reply.send(TransportStats {
                    status: self.status,
                    reconnect_attempts: self.attempts,
                    queued: self.queue.len(),
                    reconnect_pending: self.reconnect_at.is_some(),
                });
            }
        }
    }

    fn connect(&mut self, reply: oneshot::Sender<AppResult<()>>) {
        if self.status == ConnectionStatus::Connected && self.socket.is_some() {
            let _ = reply.send(Ok(()));
            return;
        }

        // An explicit connect starts a fresh retry budget, even when it
        // joins an attempt already in flight.
        self.intentional_close = false;
        self.reconnect_at = None;
        self.attempts = 0;
        self.waiters.push(reply);
        if self.establishing.is_none() {
            self.begin_attempt();
        }
    }

    fn begin_attempt(&mut self) {
        self.set_status(ConnectionStatus::Connecting, None);
        tracing::info!(
            "Connecting to {} (attempt {})",
            self.settings.endpoint,
            self.attempts + 1
        );

        let connector = self.connector.clone();
        let url = self.settings.url.clone();
        self.establishing = Some(async move { connector.connect(&url).await }.boxed());
    }

    async fn on_established(&mut self, result: AppResult<Box<dyn Socket>>) {
        match result {
            Ok(socket) => {
                self.socket = Some(socket);
                self.attempts = 0;
                self.start_heartbeat();
                self.flush_queue().await;
                self.set_status(ConnectionStatus::Connected, None);
                tracing::info!("Connected to {}", self.settings.endpoint);
                for waiter in self.waiters.drain(..) {
                    let _ = waiter.send(Ok(()));
                }
            }
            Err(e) => {
                tracing::warn!("Connection to {} failed: {}", self.settings.endpoint, e);
                self.set_status(ConnectionStatus::Error, Some(e.message.clone()));
                for waiter in self.waiters.drain(..) {
                    let _ = waiter.send(Err(e.clone()));
                }
                self.schedule_reconnect();
            }
        }
    }

    fn on_text(&mut self, text: &str) {
        let envelope = match serializer::decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!("Discarding malformed envelope: {}", e);
                return;
            }
        };

        if envelope.event_type.is_reserved() {
            tracing::trace!("Ignoring inbound '{}' envelope", envelope.event_type);
            return;
        }

        self.dispatcher.dispatch(&envelope);
    }

    fn on_closed(&mut self, error: Option<AppError>) {
        self.socket = None;
        self.heartbeat = None;

        match error {
            Some(e) => {
                tracing::warn!("Connection to {} lost: {}", self.settings.endpoint, e);
                self.set_status(ConnectionStatus::Error, Some(e.message));
            }
            None => {
                tracing::info!("Connection to {} closed by peer", self.settings.endpoint);
                self.set_status(ConnectionStatus::Disconnected, None);
            }
        }

        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        if self.intentional_close {
            return;
        }

        let policy = self.settings.policy;
        if policy.is_exhausted(self.attempts) {
            let reason = format!(
                "Max reconnection attempts reached ({})",
                policy.max_attempts
            );
            tracing::error!("{} for {}", reason, self.settings.endpoint);
            self.set_status(ConnectionStatus::Error, Some(reason));
            return;
        }

        self.attempts += 1;
        let delay = policy.delay_for_attempt(self.attempts);
        tracing::info!(
            "Reconnecting to {} in {}ms (attempt {}/{})",
            self.settings.endpoint,
            delay.as_millis(),
            self.attempts,
            policy.max_attempts
        );
        self.reconnect_at = Some(Instant::now() + delay);
    }

    async fn disconnect(&mut self) {
        self.intentional_close = true;
        self.heartbeat = None;
        self.reconnect_at = None;
        self.establishing = None;

        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(Err(AppError::connection(
                "Connection attempt aborted by disconnect",
            )));
        }

        if let Some(mut socket) = self.socket.take() {
            socket.close().await;
            tracing::info!("Disconnected from {}", self.settings.endpoint);
        }

        self.set_status(ConnectionStatus::Disconnected, None);
    }

    fn enqueue(&mut self, envelope: Envelope) {
        if let Some(cap) = self.settings.max_queue_size {
            while self.queue.len() >= cap.max(1) {
                if let Some(dropped) = self.queue.pop_front() {
                    tracing::warn!(
                        "Outbound queue full ({}), dropping oldest '{}' envelope",
                        cap,
                        dropped.event_type
                    );
                }
            }
        }
        self.queue.push_back(envelope);
    }

    /// Write queued envelopes in FIFO order, stopping at the first failure.
    async fn flush_queue(&mut self) {
        while let Some(envelope) = self.queue.pop_front() {
            let Some(socket) = self.socket.as_mut() else {
                self.queue.push_front(envelope);
                return;
            };

            let text = match serializer::encode(&envelope) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(
                        "Dropping unserializable '{}' envelope: {}",
                        envelope.event_type,
                        e
                    );
                    continue;
                }
            };

            if let Err(e) = socket.send_text(text).await {
                tracing::debug!(
                    "Send failed, keeping {} envelope(s) queued: {}",
                    self.queue.len() + 1,
                    e
                );
                self.queue.push_front(envelope);
                return;
            }
        }
    }

    fn start_heartbeat(&mut self) {
        let period = self.settings.heartbeat_interval;
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.heartbeat = Some(interval);
    }

    async fn on_heartbeat(&mut self) {
        if self.status != ConnectionStatus::Connected {
            return;
        }

        // Never let a heartbeat overtake queued application messages.
        if !self.queue.is_empty() {
            self.flush_queue().await;
            if !self.queue.is_empty() {
                return;
            }
        }

        let Some(socket) = self.socket.as_mut() else {
            return;
        };
        match serializer::encode(&Envelope::heartbeat()) {
            Ok(text) => {
                if let Err(e) = socket.send_text(text).await {
                    tracing::debug!("Heartbeat send failed: {}", e);
                } else {
                    tracing::trace!("Heartbeat sent to {}", self.settings.endpoint);
                }
            }
            Err(e) => tracing::error!("Failed to encode heartbeat: {}", e),
        }
    }

    fn set_status(&mut self, status: ConnectionStatus, error: Option<String>) {
        if self.status == status && error.is_none() {
            return;
        }
        self.status = status;
        self.status_tx.send_replace(status);
        tracing::debug!("Transport status -> {}", status);
        self.dispatcher.dispatch(&Envelope::status(status, error));
    }
}

async fn establish(pending: &mut Option<Establishing>) -> AppResult<Box<dyn Socket>> {
    match pending.as_mut() {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn next_frame(socket: &mut Option<Box<dyn Socket>>) -> Option<AppResult<String>> {
    match socket.as_mut() {
        Some(socket) => socket.next_text().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval.as_mut() {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
