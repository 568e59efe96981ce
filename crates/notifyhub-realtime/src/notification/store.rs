//! In-memory notification store for one user session.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use notifyhub_core::config::store::{DisabledKindPolicy, StoreConfig};
use notifyhub_core::types::{NotificationId, UserId};
use notifyhub_core::{AppError, AppResult};

use crate::message::{ConnectionStatus, Envelope, StatusPayload};

use super::clock::{Clock, SystemClock};
use super::events::StoreEvent;
use super::filter::{NotificationFilter, SortOrder};
use super::model::{NewNotification, Notification};
use super::preferences::{NotificationPreferences, PreferencesPatch};

/// What `add_notification` did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Stored and visible.
    Surfaced(NotificationId),
    /// Stored for history; its kind or the in-app channel is disabled.
    Hidden(NotificationId),
    /// Held until quiet hours end.
    Deferred(NotificationId),
    /// Discarded under [`DisabledKindPolicy::Drop`].
    Dropped,
}

/// Ordered notifications, the session's preferences and mirrored
/// connectivity.
///
/// Records are kept most-recent-first. Every change is published as a
/// [`StoreEvent`]; the ones with a wire form are also pushed, unbounded and
/// in order, to the outbox set by [`NotificationStore::forward_to`].
pub struct NotificationStore {
    user_id: UserId,
    notifications: Vec<Notification>,
    /// Records that failed the preference gate on arrival.
    hidden: HashSet<NotificationId>,
    /// Quiet-hours holdback, in arrival order.
    deferred: VecDeque<Notification>,
    preferences: NotificationPreferences,
    policy: DisabledKindPolicy,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<StoreEvent>,
    outbox: Option<mpsc::UnboundedSender<Envelope>>,
    connection_status: ConnectionStatus,
    last_error: Option<String>,
}

impl std::fmt::Debug for NotificationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationStore")
            .field("user_id", &self.user_id)
            .field("notifications", &self.notifications.len())
            .field("deferred", &self.deferred.len())
            .field("connection_status", &self.connection_status)
            .finish()
    }
}

impl NotificationStore {
    /// Create a store for the owner of `preferences`, using the system clock.
    pub fn new(preferences: NotificationPreferences, config: &StoreConfig) -> Self {
        Self::with_clock(preferences, config, Arc::new(SystemClock))
    }

    /// Create a store with a custom time source.
    pub fn with_clock(
        preferences: NotificationPreferences,
        config: &StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer_size.max(1));
        Self {
            user_id: preferences.user_id,
            notifications: Vec::new(),
            hidden: HashSet::new(),
            deferred: VecDeque::new(),
            preferences,
            policy: config.disabled_kind_policy,
            clock,
            events,
            outbox: None,
            connection_status: ConnectionStatus::Disconnected,
            last_error: None,
        }
    }

    /// Receive store events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Send the wire form of every later read, archive and preference
    /// change to `outbox`. Unlike [`subscribe`](Self::subscribe), nothing
    /// sent here can be lost to a slow reader.
    pub fn forward_to(&mut self, outbox: mpsc::UnboundedSender<Envelope>) {
        self.outbox = Some(outbox);
    }

    /// Owner of this session.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Stamp and insert a notification, applying the preference gate and
    /// quiet hours.
    pub fn add_notification(&mut self, new: NewNotification) -> AppResult<AddOutcome> {
        if new.user_id != self.user_id {
            tracing::warn!(
                "Discarding notification for user {} in session of {}",
                new.user_id,
                self.user_id
            );
            return Err(AppError::validation(format!(
                "Notification addressed to user {}",
                new.user_id
            )));
        }

        self.release_due();

        let notification = new.into_notification(NotificationId::new(), self.clock.now());
        let id = notification.id;

        if !self.preferences.allows(notification.kind) {
            return Ok(match self.policy {
                DisabledKindPolicy::Hide => {
                    tracing::debug!("Hiding {:?} notification {}", notification.kind, id);
                    self.hidden.insert(id);
                    self.notifications.insert(0, notification);
                    AddOutcome::Hidden(id)
                }
                DisabledKindPolicy::Drop => {
                    tracing::debug!("Dropping {:?} notification {}", notification.kind, id);
                    AddOutcome::Dropped
                }
            });
        }

        if !notification.priority.bypasses_quiet_hours() && self.in_quiet_hours() {
            tracing::debug!("Deferring notification {} until quiet hours end", id);
            self.deferred.push_back(notification);
            return Ok(AddOutcome::Deferred(id));
        }

        self.notifications.insert(0, notification.clone());
        self.emit_surfaced(notification);
        Ok(AddOutcome::Surfaced(id))
    }

    /// Release deferred notifications if quiet hours are over.
    ///
    /// Returns how many were released.
    pub fn tick(&mut self) -> usize {
        self.release_due()
    }

    /// Mark one notification read. Returns `false` if it already was.
    pub fn mark_as_read(&mut self, id: NotificationId) -> AppResult<bool> {
        let n = self.find_mut(id)?;
        if n.read {
            return Ok(false);
        }
        n.read = true;
        self.emit(StoreEvent::NotificationRead { id });
        Ok(true)
    }

    /// Mark every notification read. Returns how many changed.
    pub fn mark_all_as_read(&mut self) -> usize {
        let ids: Vec<NotificationId> = self
            .notifications
            .iter_mut()
            .filter(|n| !n.read)
            .map(|n| {
                n.read = true;
                n.id
            })
            .collect();
        let count = ids.len();
        if count > 0 {
            self.emit(StoreEvent::AllRead { ids });
        }
        count
    }

    /// Archive a notification. Returns `false` if it already was.
    pub fn archive(&mut self, id: NotificationId) -> AppResult<bool> {
        let n = self.find_mut(id)?;
        if n.archived {
            return Ok(false);
        }
        n.archived = true;
        self.emit(StoreEvent::NotificationArchived { id });
        Ok(true)
    }

    /// Remove a notification permanently.
    pub fn delete(&mut self, id: NotificationId) -> AppResult<Notification> {
        let pos = self
            .notifications
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| not_found(id))?;
        self.hidden.remove(&id);
        Ok(self.notifications.remove(pos))
    }

    /// Remove every notification, including deferred ones.
    pub fn clear_all(&mut self) -> usize {
        let count = self.notifications.len() + self.deferred.len();
        self.notifications.clear();
        self.deferred.clear();
        self.hidden.clear();
        count
    }

    /// Merge a partial update and publish the result.
    pub fn update_preferences(&mut self, patch: PreferencesPatch) -> AppResult<()> {
        self.preferences.apply(patch)?;
        self.emit(StoreEvent::PreferencesUpdated(Box::new(
            self.preferences.clone(),
        )));
        self.release_due();
        Ok(())
    }

    /// Replace preferences with a record from the server, without
    /// publishing it back.
    pub fn replace_preferences(&mut self, preferences: NotificationPreferences) -> AppResult<()> {
        if preferences.user_id != self.user_id {
            tracing::warn!(
                "Discarding preferences for user {} in session of {}",
                preferences.user_id,
                self.user_id
            );
            return Err(AppError::validation(format!(
                "Preferences belong to user {}",
                preferences.user_id
            )));
        }
        preferences.validate()?;
        self.preferences = preferences;
        self.release_due();
        Ok(())
    }

    /// Mirror a transport status envelope.
    pub fn set_connection_status(&mut self, payload: &StatusPayload) {
        self.connection_status = payload.status;
        match payload.status {
            ConnectionStatus::Error => self.last_error = payload.error.clone(),
            ConnectionStatus::Connected => self.last_error = None,
            _ => {}
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Matching records as a new sequence, newest first unless the filter
    /// says otherwise. Equal timestamps put higher priority first.
    pub fn get_filtered(&self, filter: &NotificationFilter) -> Vec<Notification> {
        let mut out: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            let by_time = match filter.order {
                SortOrder::NewestFirst => b.timestamp.cmp(&a.timestamp),
                SortOrder::OldestFirst => a.timestamp.cmp(&b.timestamp),
            };
            by_time.then_with(|| b.priority.cmp(&a.priority))
        });
        out
    }

    /// Unread, unarchived records that passed the preference gate.
    pub fn unread_count(&self) -> usize {
        self.notifications
            .iter()
            .filter(|n| !n.read && !n.archived && !self.hidden.contains(&n.id))
            .count()
    }

    /// Unarchived records that passed the preference gate, newest first.
    pub fn visible(&self) -> Vec<&Notification> {
        self.notifications
            .iter()
            .filter(|n| !n.archived && !self.hidden.contains(&n.id))
            .collect()
    }

    /// Look up a stored record. Deferred records are not addressable yet.
    pub fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.id == id)
    }

    /// Every stored record, newest first.
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Whether a stored record failed the preference gate.
    pub fn is_hidden(&self, id: NotificationId) -> bool {
        self.hidden.contains(&id)
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    pub fn preferences(&self) -> &NotificationPreferences {
        &self.preferences
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection_status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // ── Internals ────────────────────────────────────────────────────

    fn in_quiet_hours(&self) -> bool {
        self.preferences
            .quiet_hours
            .is_active_at(self.clock.local_time())
    }

    fn release_due(&mut self) -> usize {
        if self.deferred.is_empty() || self.in_quiet_hours() {
            return 0;
        }
        let released = self.deferred.len();
        tracing::info!("Quiet hours over, releasing {} notification(s)", released);
        while let Some(n) = self.deferred.pop_front() {
            let pos = self
                .notifications
                .partition_point(|e| e.timestamp > n.timestamp);
            self.notifications.insert(pos, n.clone());
            self.emit_surfaced(n);
        }
        released
    }

    fn find_mut(&mut self, id: NotificationId) -> AppResult<&mut Notification> {
        self.notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| not_found(id))
    }

    fn emit_surfaced(&self, notification: Notification) {
        let sound_volume = self
            .preferences
            .sound_enabled
            .then_some(self.preferences.sound_volume);
        self.emit(StoreEvent::Surfaced {
            notification: Box::new(notification),
            sound_volume,
        });
    }

    fn emit(&self, event: StoreEvent) {
        if let (Some(outbox), Some(envelope)) = (&self.outbox, event.to_envelope()) {
            if outbox.send(envelope).is_err() {
                tracing::debug!("Store outbox closed, dropping {:?}", event);
            }
        }
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn not_found(id: NotificationId) -> AppError {
    AppError::not_found(format!("Notification {id} not found"))
}
