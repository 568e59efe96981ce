//! Events published by the store for other components to act on.

use serde_json::json;

use notifyhub_core::types::NotificationId;

use crate::message::{Envelope, EventType};

use super::model::Notification;
use super::preferences::NotificationPreferences;

/// Something the store did that the outside world may care about.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    NotificationRead { id: NotificationId },
    AllRead { ids: Vec<NotificationId> },
    NotificationArchived { id: NotificationId },
    PreferencesUpdated(Box<NotificationPreferences>),
    /// A record became visible. `sound_volume` is set when a cue should play.
    Surfaced {
        notification: Box<Notification>,
        sound_volume: Option<u8>,
    },
}

impl StoreEvent {
    /// Outbound envelope to mirror this event to the server, if any.
    pub fn to_envelope(&self) -> Option<Envelope> {
        let (event_type, data) = match self {
            Self::NotificationRead { id } => {
                (EventType::NotificationRead, json!({ "notificationId": id }))
            }
            Self::AllRead { ids } => (
                EventType::NotificationRead,
                json!({ "notificationIds": ids }),
            ),
            Self::NotificationArchived { id } => (
                EventType::NotificationArchived,
                json!({ "notificationId": id }),
            ),
            Self::PreferencesUpdated(prefs) => (
                EventType::PreferencesUpdated,
                serde_json::to_value(prefs.as_ref()).ok()?,
            ),
            Self::Surfaced { .. } => return None,
        };
        Some(Envelope::with_id(event_type, data))
    }
}
