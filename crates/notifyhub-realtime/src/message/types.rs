//! Event type tags and connection status definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Event type carried in the `type` field of every envelope.
///
/// Known wire names map to dedicated variants; anything else is kept
/// verbatim in [`EventType::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    /// Server acknowledged the session.
    Connect,
    /// Server is about to close the session.
    Disconnect,
    /// A notification record.
    Notification,
    /// A notification was marked read.
    NotificationRead,
    /// A notification was archived.
    NotificationArchived,
    /// Preferences changed.
    PreferencesUpdated,
    /// Liveness frame, never surfaced to consumers.
    Heartbeat,
    /// Server-reported error.
    Error,
    /// Locally synthesized connectivity status.
    Status,
    /// Any other wire type.
    Custom(String),
}

impl EventType {
    /// Parse a wire name.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "connect" => Self::Connect,
            "disconnect" => Self::Disconnect,
            "notification" => Self::Notification,
            "notification_read" => Self::NotificationRead,
            "notification_archived" => Self::NotificationArchived,
            "preferences_updated" => Self::PreferencesUpdated,
            "heartbeat" => Self::Heartbeat,
            "error" => Self::Error,
            "status" => Self::Status,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Wire name of this type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Notification => "notification",
            Self::NotificationRead => "notification_read",
            Self::NotificationArchived => "notification_archived",
            Self::PreferencesUpdated => "preferences_updated",
            Self::Heartbeat => "heartbeat",
            Self::Error => "error",
            Self::Status => "status",
            Self::Custom(s) => s.as_str(),
        }
    }

    /// Whether this type is reserved for the transport itself.
    pub fn is_reserved(&self) -> bool {
        matches!(self, Self::Heartbeat | Self::Status)
    }
}

impl From<String> for EventType {
    fn from(s: String) -> Self {
        match Self::from_wire(&s) {
            Self::Custom(_) => Self::Custom(s),
            known => known,
        }
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        Self::from_wire(s)
    }
}

impl From<EventType> for String {
    fn from(t: EventType) -> Self {
        match t {
            EventType::Custom(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connectivity state of a transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// An establishment attempt is in flight.
    Connecting,
    /// The socket is open.
    Connected,
    /// No socket and no attempt in flight.
    #[default]
    Disconnected,
    /// The last attempt or the open socket failed.
    Error,
}

impl ConnectionStatus {
    /// Converts to string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a synthesized `status` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPayload {
    /// New status.
    pub status: ConnectionStatus,
    /// Reason, when the status is `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
