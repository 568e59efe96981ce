//! Transport (WebSocket connection) configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AppError;

/// Connection settings consumed when a transport is constructed.
///
/// The token is captured once; rotating it means building a new transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Base endpoint, e.g. `wss://api.example.com/notifications`.
    pub url: String,
    /// Bearer credential appended as `?token=<value>`.
    #[serde(default)]
    pub token: Option<String>,
    /// Automatic reconnect attempts before giving up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnect attempt, in milliseconds.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// Upper bound for the reconnect delay, in milliseconds.
    #[serde(default = "default_max_reconnect_delay")]
    pub max_reconnect_delay_ms: u64,
    /// Heartbeat interval while connected, in milliseconds.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,
    /// Outbound queue cap. `None` keeps the queue unbounded; when set, the
    /// oldest queued envelope is dropped on overflow.
    #[serde(default)]
    pub max_queue_size: Option<usize>,
}

impl TransportConfig {
    /// Create a config for `url` with default timings and no token.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay(),
            max_reconnect_delay_ms: default_max_reconnect_delay(),
            heartbeat_interval_ms: default_heartbeat_interval(),
            max_queue_size: None,
        }
    }

    /// Set the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Build the URL actually dialled, with the token as a query parameter.
    pub fn endpoint_url(&self) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.url)?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(AppError::configuration(format!(
                    "Unsupported endpoint scheme '{other}', expected ws or wss"
                )));
            }
        }
        if let Some(token) = self.token.as_deref().filter(|t| !t.is_empty()) {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }

    /// Base reconnect delay as a [`Duration`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Maximum reconnect delay as a [`Duration`].
    pub fn max_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_delay_ms)
    }

    /// Heartbeat interval as a [`Duration`].
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms.max(1))
    }
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_delay() -> u64 {
    1000
}

fn default_max_reconnect_delay() -> u64 {
    30_000
}

fn default_heartbeat_interval() -> u64 {
    30_000
}
