//! Notification priority levels.

use serde::{Deserialize, Serialize};

/// Notification priority, ordered `Low < Normal < High < Critical`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Background events.
    Low,
    /// Standard events.
    #[default]
    Normal,
    /// Important events.
    High,
    /// Security and system alerts; bypasses quiet hours.
    Critical,
}

impl Priority {
    /// Convert to string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Whether this priority is delivered even during quiet hours.
    pub fn bypasses_quiet_hours(&self) -> bool {
        matches!(self, Self::Critical)
    }
}
