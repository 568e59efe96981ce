//! Quiet-hours window.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use notifyhub_core::{AppError, AppResult};

/// Local time window during which non-critical notifications are deferred.
///
/// The window is `[start_time, end_time)` and wraps past midnight when
/// `start_time > end_time`. Equal bounds describe an empty window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuietHours {
    /// Whether the window is applied at all.
    pub enabled: bool,
    /// Start, serialized as `HH:MM`.
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    /// End (exclusive), serialized as `HH:MM`.
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
}

impl QuietHours {
    /// Enabled window between two `HH:MM` strings.
    pub fn between(start: &str, end: &str) -> AppResult<Self> {
        Ok(Self {
            enabled: true,
            start_time: parse_hhmm(start)?,
            end_time: parse_hhmm(end)?,
        })
    }

    /// Whether `time` falls inside the window.
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start_time <= self.end_time {
            self.start_time <= time && time < self.end_time
        } else {
            time >= self.start_time || time < self.end_time
        }
    }

    /// Whether the window is enabled and contains `time`.
    pub fn is_active_at(&self, time: NaiveTime) -> bool {
        self.enabled && self.contains(time)
    }
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default(),
            end_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
        }
    }
}

/// Parse `HH:MM`.
pub fn parse_hhmm(value: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| {
        AppError::validation(format!("Invalid time '{value}', expected HH:MM: {e}"))
    })
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_hhmm(&s).map_err(serde::de::Error::custom)
    }
}
