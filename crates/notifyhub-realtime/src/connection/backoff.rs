//! Exponential reconnect backoff.

use std::time::Duration;

use notifyhub_core::config::transport::TransportConfig;

/// Reconnect schedule: `min(base × 2^(attempt−1), max)` for attempts
/// `1..=max_attempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Attempts allowed before giving up.
    pub max_attempts: u32,
    /// Delay before the first attempt.
    pub base_delay: Duration,
    /// Upper bound for any delay.
    pub max_delay: Duration,
}

impl ReconnectPolicy {
    /// Build from transport settings.
    pub fn from_config(config: &TransportConfig) -> Self {
        Self {
            max_attempts: config.max_reconnect_attempts,
            base_delay: config.reconnect_delay(),
            max_delay: config.max_reconnect_delay(),
        }
    }

    /// Delay before attempt number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Whether `attempts` already made exhausts the budget.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}
