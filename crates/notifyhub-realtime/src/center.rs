//! Composition of transport, dispatcher and store for one session.

use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use notifyhub_core::config::store::StoreConfig;
use notifyhub_core::types::{HandlerId, NotificationId};
use notifyhub_core::{AppError, AppResult};

use crate::connection::TransportConnection;
use crate::message::{ConnectionStatus, Envelope, EventType};
use crate::notification::{
    AddOutcome, NewNotification, Notification, NotificationFilter, NotificationPreferences,
    NotificationStore, PreferencesPatch, StoreEvent,
};

/// Owns the session's transport and store and keeps them in sync.
///
/// Inbound `notification`, `preferences_updated` and `status` envelopes
/// update the store; read, archive and preference changes made through the
/// store are sent back to the server, queued while offline. A background
/// ticker releases quiet-hours holdbacks. Dropping the center stops both
/// background tasks and unregisters its handlers.
pub struct NotificationCenter {
    transport: TransportConnection,
    store: Arc<Mutex<NotificationStore>>,
    handlers: Vec<HandlerId>,
    tasks: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("transport", &self.transport)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl NotificationCenter {
    /// Wire `store` to `transport`. Must be called inside a Tokio runtime.
    pub fn new(
        transport: TransportConnection,
        mut store: NotificationStore,
        config: &StoreConfig,
    ) -> AppResult<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            AppError::internal("NotificationCenter must be created inside a Tokio runtime")
        })?;

        let (outbox, outbound) = mpsc::unbounded_channel();
        store.forward_to(outbox);
        let store = Arc::new(Mutex::new(store));

        let handlers = vec![
            transport.on(EventType::Notification, {
                let store = store.clone();
                move |env| {
                    let new: NewNotification = serde_json::from_value(env.data.clone())?;
                    lock(&store).add_notification(new).map(|_| ())
                }
            }),
            transport.on(EventType::PreferencesUpdated, {
                let store = store.clone();
                move |env| {
                    let prefs: NotificationPreferences =
                        serde_json::from_value(env.data.clone())?;
                    lock(&store).replace_preferences(prefs)
                }
            }),
            transport.on(EventType::Status, {
                let store = store.clone();
                move |env| {
                    if let Some(payload) = env.status_payload() {
                        lock(&store).set_connection_status(&payload);
                    }
                    Ok(())
                }
            }),
        ];

        let tasks = vec![
            runtime.spawn(forward_outbound(outbound, transport.clone())),
            runtime.spawn(release_quiet_hours(
                store.clone(),
                config.quiet_hours_check_interval(),
            )),
        ];

        Ok(Self {
            transport,
            store,
            handlers,
            tasks,
        })
    }

    // ── Connection ───────────────────────────────────────────────────

    pub async fn connect(&self) -> AppResult<()> {
        self.transport.connect().await
    }

    pub async fn reconnect(&self) -> AppResult<()> {
        self.transport.reconnect().await
    }

    pub async fn disconnect(&self) {
        self.transport.disconnect().await
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.transport.status()
    }

    pub fn transport(&self) -> &TransportConnection {
        &self.transport
    }

    // ── Store ────────────────────────────────────────────────────────

    /// Run `f` with exclusive access to the store.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut NotificationStore) -> R) -> R {
        f(&mut lock(&self.store))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.with_store(|s| s.subscribe())
    }

    /// Insert a locally created notification through the same path as
    /// server-pushed ones.
    pub fn add_notification(&self, new: NewNotification) -> AppResult<AddOutcome> {
        self.with_store(|s| s.add_notification(new))
    }

    pub fn mark_as_read(&self, id: NotificationId) -> AppResult<bool> {
        self.with_store(|s| s.mark_as_read(id))
    }

    pub fn mark_all_as_read(&self) -> usize {
        self.with_store(|s| s.mark_all_as_read())
    }

    pub fn archive(&self, id: NotificationId) -> AppResult<bool> {
        self.with_store(|s| s.archive(id))
    }

    pub fn delete(&self, id: NotificationId) -> AppResult<Notification> {
        self.with_store(|s| s.delete(id))
    }

    pub fn clear_all(&self) -> usize {
        self.with_store(|s| s.clear_all())
    }

    pub fn update_preferences(&self, patch: PreferencesPatch) -> AppResult<()> {
        self.with_store(|s| s.update_preferences(patch))
    }

    pub fn preferences(&self) -> NotificationPreferences {
        self.with_store(|s| s.preferences().clone())
    }

    pub fn get_filtered(&self, filter: &NotificationFilter) -> Vec<Notification> {
        self.with_store(|s| s.get_filtered(filter))
    }

    pub fn unread_count(&self) -> usize {
        self.with_store(|s| s.unread_count())
    }
}

impl Drop for NotificationCenter {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        for id in &self.handlers {
            self.transport.off(*id);
        }
    }
}

fn lock(store: &Mutex<NotificationStore>) -> std::sync::MutexGuard<'_, NotificationStore> {
    store.lock().unwrap_or_else(|e| e.into_inner())
}

/// Hand the store's wire-bound changes to the transport, in order.
async fn forward_outbound(
    mut outbound: mpsc::UnboundedReceiver<Envelope>,
    transport: TransportConnection,
) {
    while let Some(envelope) = outbound.recv().await {
        if let Err(e) = transport.send(envelope) {
            tracing::warn!("Stopping store event forwarding: {}", e);
            break;
        }
    }
}

async fn release_quiet_hours(store: Arc<Mutex<NotificationStore>>, period: std::time::Duration) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let released = lock(&store).tick();
        if released > 0 {
            tracing::debug!("Quiet-hours ticker released {} notification(s)", released);
        }
    }
}
