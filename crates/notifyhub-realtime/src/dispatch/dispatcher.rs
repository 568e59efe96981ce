//! Event dispatcher: routes envelopes to handlers registered per event type.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use notifyhub_core::types::HandlerId;
use notifyhub_core::AppResult;

use crate::message::{Envelope, EventType};

/// A subscriber callback.
pub type Handler = Arc<dyn Fn(&Envelope) -> AppResult<()> + Send + Sync>;

/// What a handler is registered for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subscription {
    /// Envelopes of one type.
    Event(EventType),
    /// Every envelope regardless of type.
    All,
}

impl From<EventType> for Subscription {
    fn from(t: EventType) -> Self {
        Self::Event(t)
    }
}

/// Registry of handlers keyed by subscription.
///
/// `dispatch` runs the handlers for the envelope's type in subscription
/// order, then the wildcard handlers. A failing or panicking handler is
/// logged and does not stop the others.
#[derive(Default)]
pub struct EventDispatcher {
    /// Subscription → ordered handlers.
    handlers: RwLock<HashMap<Subscription, Vec<(HandlerId, Handler)>>>,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handler_count", &self.handler_count())
            .finish()
    }
}

impl EventDispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, returning the ID used to remove it.
    pub fn on<F>(&self, subscription: impl Into<Subscription>, handler: F) -> HandlerId
    where
        F: Fn(&Envelope) -> AppResult<()> + Send + Sync + 'static,
    {
        let id = HandlerId::new();
        let mut map = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        map.entry(subscription.into())
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a handler. Returns `false` if it was not registered.
    pub fn off(&self, id: HandlerId) -> bool {
        let mut map = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        let mut removed = false;
        map.retain(|_, list| {
            let before = list.len();
            list.retain(|(hid, _)| *hid != id);
            removed |= list.len() < before;
            !list.is_empty()
        });
        removed
    }

    /// Deliver an envelope to its type's handlers, then to wildcard handlers.
    ///
    /// Returns the number of handlers that completed successfully.
    pub fn dispatch(&self, envelope: &Envelope) -> usize {
        // Snapshot so handlers can (un)subscribe without deadlocking.
        let targets: Vec<(HandlerId, Handler)> = {
            let map = self.handlers.read().unwrap_or_else(|e| e.into_inner());
            let typed = map.get(&Subscription::Event(envelope.event_type.clone()));
            let wildcard = map.get(&Subscription::All);
            typed
                .into_iter()
                .chain(wildcard)
                .flatten()
                .cloned()
                .collect()
        };

        tracing::trace!(
            "Dispatching '{}' to {} handler(s)",
            envelope.event_type,
            targets.len()
        );

        let mut delivered = 0;
        for (id, handler) in targets {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(envelope))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    tracing::warn!(
                        "Handler {} failed for '{}': {}",
                        id,
                        envelope.event_type,
                        e
                    );
                }
                Err(_) => {
                    tracing::error!("Handler {} panicked for '{}'", id, envelope.event_type);
                }
            }
        }
        delivered
    }

    /// Total registered handlers across all subscriptions.
    pub fn handler_count(&self) -> usize {
        let map = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        map.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use notifyhub_core::AppError;
    use serde_json::Value;

    use super::*;

    fn new_log() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn test_typed_then_wildcard_in_subscription_order() {
        let dispatcher = EventDispatcher::new();
        let log = new_log();

        let l = log.clone();
        dispatcher.on(Subscription::All, move |_| {
            l.lock().unwrap().push("wildcard".into());
            Ok(())
        });
        let l = log.clone();
        dispatcher.on(EventType::Notification, move |_| {
            l.lock().unwrap().push("first".into());
            Ok(())
        });
        let l = log.clone();
        dispatcher.on(EventType::Notification, move |_| {
            l.lock().unwrap().push("second".into());
            Ok(())
        });

        let delivered = dispatcher.dispatch(&Envelope::new(EventType::Notification, Value::Null));
        assert_eq!(delivered, 3);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "wildcard"]);
    }

    #[test]
    fn test_other_types_only_reach_wildcard() {
        let dispatcher = EventDispatcher::new();
        let log = new_log();

        let l = log.clone();
        dispatcher.on(EventType::Notification, move |_| {
            l.lock().unwrap().push("typed".into());
            Ok(())
        });
        let l = log.clone();
        dispatcher.on(Subscription::All, move |env| {
            l.lock().unwrap().push(env.event_type.to_string());
            Ok(())
        });

        dispatcher.dispatch(&Envelope::new("custom_event", Value::Null));
        assert_eq!(*log.lock().unwrap(), vec!["custom_event"]);
    }

    #[test]
    fn test_failing_handlers_are_isolated() {
        let dispatcher = EventDispatcher::new();
        let log = new_log();

        dispatcher.on(EventType::Notification, |_| Err(AppError::internal("boom")));
        dispatcher.on(EventType::Notification, |_| panic!("handler panic"));
        let l = log.clone();
        dispatcher.on(EventType::Notification, move |_| {
            l.lock().unwrap().push("survivor".into());
            Ok(())
        });

        let delivered = dispatcher.dispatch(&Envelope::new(EventType::Notification, Value::Null));
        assert_eq!(delivered, 1);
        assert_eq!(*log.lock().unwrap(), vec!["survivor"]);
    }

    #[test]
    fn test_off_removes_only_that_handler() {
        let dispatcher = EventDispatcher::new();
        let a = dispatcher.on(EventType::Status, |_| Ok(()));
        let _b = dispatcher.on(EventType::Status, |_| Ok(()));
        assert_eq!(dispatcher.handler_count(), 2);

        assert!(dispatcher.off(a));
        assert!(!dispatcher.off(a));
        assert_eq!(dispatcher.handler_count(), 1);
    }

    #[test]
    fn test_handler_may_unsubscribe_itself() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let slot: Arc<Mutex<Option<HandlerId>>> = Arc::new(Mutex::new(None));

        let d = dispatcher.clone();
        let s = slot.clone();
        let id = dispatcher.on(EventType::Connect, move |_| {
            if let Some(id) = s.lock().unwrap().take() {
                d.off(id);
            }
            Ok(())
        });
        *slot.lock().unwrap() = Some(id);

        assert_eq!(dispatcher.dispatch(&Envelope::new(EventType::Connect, Value::Null)), 1);
        assert_eq!(dispatcher.dispatch(&Envelope::new(EventType::Connect, Value::Null)), 0);
    }
}
