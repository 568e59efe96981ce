//! Message envelope exchanged in both directions over the transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::types::{ConnectionStatus, EventType, StatusPayload};

/// Envelope wrapping every message with its type tag and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Routing tag.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Arbitrary payload.
    #[serde(default)]
    pub data: Value,
    /// When the message was created.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Optional message ID for deduplication and ack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl Envelope {
    /// Create an envelope stamped now, without a message ID.
    pub fn new(event_type: impl Into<EventType>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            timestamp: Utc::now(),
            message_id: None,
        }
    }

    /// Create an envelope stamped now with a fresh message ID.
    pub fn with_id(event_type: impl Into<EventType>, data: Value) -> Self {
        Self {
            message_id: Some(Uuid::new_v4().to_string()),
            ..Self::new(event_type, data)
        }
    }

    /// Outbound liveness frame.
    pub fn heartbeat() -> Self {
        let now = Utc::now();
        Self {
            event_type: EventType::Heartbeat,
            data: serde_json::json!({ "timestamp": now.to_rfc3339() }),
            timestamp: now,
            message_id: None,
        }
    }

    /// Locally synthesized connectivity envelope.
    pub fn status(status: ConnectionStatus, error: Option<String>) -> Self {
        let payload = StatusPayload { status, error };
        Self::new(
            EventType::Status,
            serde_json::to_value(payload).unwrap_or(Value::Null),
        )
    }

    /// Decode the payload of a `status` envelope.
    pub fn status_payload(&self) -> Option<StatusPayload> {
        if self.event_type != EventType::Status {
            return None;
        }
        serde_json::from_value(self.data.clone()).ok()
    }
}
