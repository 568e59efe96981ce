//! Caller-facing handle to a transport connection.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};

use notifyhub_core::config::transport::TransportConfig;
use notifyhub_core::types::HandlerId;
use notifyhub_core::{AppError, AppResult};

use crate::dispatch::{EventDispatcher, Subscription};
use crate::message::{ConnectionStatus, Envelope, EventType};

use super::backoff::ReconnectPolicy;
use super::connector::{Connector, WsConnector};
use super::driver::{Command, Driver, DriverSettings};

/// Snapshot of transport internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransportStats {
    /// Current status.
    pub status: ConnectionStatus,
    /// Consecutive failed reconnect attempts.
    pub reconnect_attempts: u32,
    /// Envelopes waiting in the outbound queue.
    pub queued: usize,
    /// Whether a reconnect timer is armed.
    pub reconnect_pending: bool,
}

/// Handle to one managed connection.
///
/// Cloning is cheap; all clones drive the same connection. The background
/// driver stops once the last clone is dropped. A handler that captures a
/// clone of its own transport keeps the driver alive, so capture the
/// dispatcher or a channel instead.
#[derive(Clone)]
pub struct TransportConnection {
    /// Command channel into the driver task.
    commands: mpsc::UnboundedSender<Command>,
    /// Shared handler registry.
    dispatcher: Arc<EventDispatcher>,
    /// Latest status published by the driver.
    status: watch::Receiver<ConnectionStatus>,
}

impl std::fmt::Debug for TransportConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportConnection")
            .field("status", &self.status())
            .finish()
    }
}

impl TransportConnection {
    /// Create a WebSocket transport. Must be called inside a Tokio runtime.
    pub fn new(config: &TransportConfig) -> AppResult<Self> {
        Self::with_connector(config, Arc::new(WsConnector))
    }

    /// Create a transport over a custom [`Connector`].
    pub fn with_connector(
        config: &TransportConfig,
        connector: Arc<dyn Connector>,
    ) -> AppResult<Self> {
        let url = config.endpoint_url()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            AppError::internal("TransportConnection must be created inside a Tokio runtime")
        })?;

        let endpoint = format!(
            "{}://{}{}",
            url.scheme(),
            url.host_str().unwrap_or_default(),
            url.path()
        );
        let settings = DriverSettings {
            url: url.to_string(),
            endpoint,
            policy: ReconnectPolicy::from_config(config),
            heartbeat_interval: config.heartbeat_interval(),
            max_queue_size: config.max_queue_size,
        };

        let dispatcher = Arc::new(EventDispatcher::new());
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(ConnectionStatus::Disconnected);
        let driver = Driver::new(
            settings,
            connector,
            dispatcher.clone(),
            status_tx,
            commands_rx,
        );
        runtime.spawn(driver.run());

        Ok(Self {
            commands,
            dispatcher,
            status,
        })
    }

    /// Open the connection.
    ///
    /// Resolves once connected, or with the establishment error. A no-op
    /// when already connected; joins an attempt already in flight.
    pub async fn connect(&self) -> AppResult<()> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Connect(tx))?;
        rx.await.map_err(|_| driver_stopped())?
    }

    /// Retry now after a failure, with a fresh attempt budget.
    pub async fn reconnect(&self) -> AppResult<()> {
        self.connect().await
    }

    /// Close the connection and cancel heartbeat and reconnect timers.
    ///
    /// No automatic reconnect happens afterwards until `connect` is called.
    pub async fn disconnect(&self) {
        let (tx, rx) = oneshot::channel();
        if self.command(Command::Disconnect(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Transmit now if connected, otherwise queue for the next connection.
    pub fn send(&self, envelope: Envelope) -> AppResult<()> {
        self.command(Command::Send(envelope))
    }

    /// Build and send an envelope with a fresh message ID.
    pub fn send_event(&self, event_type: impl Into<EventType>, data: Value) -> AppResult<()> {
        self.send(Envelope::with_id(event_type, data))
    }

    /// Register an inbound handler.
    pub fn on<F>(&self, subscription: impl Into<Subscription>, handler: F) -> HandlerId
    where
        F: Fn(&Envelope) -> AppResult<()> + Send + Sync + 'static,
    {
        self.dispatcher.on(subscription, handler)
    }

    /// Remove an inbound handler.
    pub fn off(&self, id: HandlerId) -> bool {
        self.dispatcher.off(id)
    }

    /// Current status.
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Whether the socket is open.
    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// Receiver that observes every status change.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// The dispatcher inbound envelopes are routed through.
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    /// Snapshot of attempt counter and queue depth.
    pub async fn stats(&self) -> AppResult<TransportStats> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Stats(tx))?;
        rx.await.map_err(|_| driver_stopped())
    }

    fn command(&self, cmd: Command) -> AppResult<()> {
        self.commands.send(cmd).map_err(|_| driver_stopped())
    }
}

fn driver_stopped() -> AppError {
    AppError::service_unavailable("Transport driver has stopped")
}
