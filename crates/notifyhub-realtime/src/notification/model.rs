//! Notification records and kinds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use notifyhub_core::types::{NotificationId, UserId};

use super::priority::Priority;

/// Closed set of notification kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewMessage,
    BookingRequest,
    BookingConfirmed,
    BookingCancelled,
    PaymentReceived,
    PaymentPending,
    ProfileVerified,
    ProfileReview,
    PlatformUpdate,
    SecurityAlert,
    ContractSigned,
    ReviewReceived,
    Promotion,
    SystemAlert,
}

/// A notification held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub priority: Priority,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_label: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    /// ID of the related booking, message, etc.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_id: Option<String>,
}

/// Fields supplied by the server or a local caller; the store assigns
/// the ID, timestamp and read/archived flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub priority: Priority,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub action_url: Option<String>,
    #[serde(default)]
    pub action_label: Option<String>,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub related_id: Option<String>,
}

impl NewNotification {
    /// Minimal notification with normal priority.
    pub fn new(
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            kind,
            priority: Priority::Normal,
            title: title.into(),
            message: message.into(),
            description: None,
            icon: None,
            action_url: None,
            action_label: None,
            data: None,
            related_id: None,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Attach a call-to-action.
    pub fn with_action(mut self, url: impl Into<String>, label: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self.action_label = Some(label.into());
        self
    }

    /// Set the related entity ID.
    pub fn with_related_id(mut self, related_id: impl Into<String>) -> Self {
        self.related_id = Some(related_id.into());
        self
    }

    pub(crate) fn into_notification(
        self,
        id: NotificationId,
        timestamp: DateTime<Utc>,
    ) -> Notification {
        Notification {
            id,
            user_id: self.user_id,
            kind: self.kind,
            priority: self.priority,
            title: self.title,
            message: self.message,
            description: self.description,
            icon: self.icon,
            action_url: self.action_url,
            action_label: self.action_label,
            timestamp,
            read: false,
            archived: false,
            data: self.data,
            related_id: self.related_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_inbound_payload_ignores_server_assigned_fields() {
        let user = UserId::new();
        let payload = json!({
            "id": "server-side-id",
            "userId": user,
            "type": "booking_request",
            "title": "New booking",
            "message": "Alex requested Friday",
            "actionUrl": "/bookings/7",
            "read": true
        });
        let new: NewNotification = serde_json::from_value(payload).expect("parse");
        assert_eq!(new.kind, NotificationKind::BookingRequest);
        assert_eq!(new.priority, Priority::Normal);
        assert_eq!(new.action_url.as_deref(), Some("/bookings/7"));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let payload = json!({
            "userId": UserId::new(),
            "type": "weather",
            "title": "t",
            "message": "m"
        });
        assert!(serde_json::from_value::<NewNotification>(payload).is_err());
    }

    #[test]
    fn test_record_wire_shape() {
        let n = NewNotification::new(UserId::new(), NotificationKind::Promotion, "t", "m")
            .into_notification(NotificationId::new(), Utc::now());
        let json = serde_json::to_value(&n).expect("serialize");
        assert_eq!(json["type"], "promotion");
        assert_eq!(json["read"], false);
        assert!(json.get("userId").is_some());
        assert!(json.get("actionUrl").is_none());

        let kind = NotificationKind::BookingConfirmed;
        let booked = NewNotification::new(UserId::new(), kind, "t", "m")
            .with_action("/bookings/17", "View booking")
            .with_related_id("17")
            .into_notification(NotificationId::new(), Utc::now());
        let json = serde_json::to_value(&booked).expect("serialize");
        assert_eq!(json["actionUrl"], "/bookings/17");
        assert_eq!(json["actionLabel"], "View booking");
        assert_eq!(json["relatedId"], "17");
    }
}
