//! Notification store configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What to do with a notification whose kind or in-app channel is disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisabledKindPolicy {
    /// Keep the record for history but leave it out of the unread count
    /// and the visible view.
    #[default]
    Hide,
    /// Discard the record on arrival.
    Drop,
}

/// In-memory notification store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Policy for kinds disabled in the user's preferences.
    #[serde(default)]
    pub disabled_kind_policy: DisabledKindPolicy,
    /// How often deferred quiet-hours notifications are re-checked, in seconds.
    #[serde(default = "default_quiet_hours_check_interval")]
    pub quiet_hours_check_interval_secs: u64,
    /// Capacity of the store event broadcast channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer_size: usize,
}

impl StoreConfig {
    /// Quiet-hours re-check interval as a [`Duration`].
    pub fn quiet_hours_check_interval(&self) -> Duration {
        Duration::from_secs(self.quiet_hours_check_interval_secs.max(1))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            disabled_kind_policy: DisabledKindPolicy::default(),
            quiet_hours_check_interval_secs: default_quiet_hours_check_interval(),
            event_buffer_size: default_event_buffer(),
        }
    }
}

fn default_quiet_hours_check_interval() -> u64 {
    30
}

fn default_event_buffer() -> usize {
    64
}
