//! Client configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod logging;
pub mod store;
pub mod transport;

use serde::{Deserialize, Serialize};

use self::logging::LoggingConfig;
use self::store::StoreConfig;
use self::transport::TransportConfig;

use crate::error::AppError;

pub use self::store::DisabledKindPolicy;

/// Root client configuration.
///
/// Deserialization target for the merged configuration sources
/// (default.toml + environment overlay + `NOTIFYHUB__*` variables).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Connection settings.
    pub transport: TransportConfig,
    /// Notification store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ClientConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `NOTIFYHUB_`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::load_with_overrides(env, &[])
    }

    /// Like [`load`](Self::load), with `(key, value)` pairs applied last,
    /// e.g. `("transport.url", "ws://...")` from command-line flags.
    pub fn load_with_overrides(env: &str, overrides: &[(&str, String)]) -> Result<Self, AppError> {
        tracing::debug!(
            "Loading configuration for environment '{}' ({} override(s))",
            env,
            overrides.len()
        );
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("NOTIFYHUB")
                    .separator("__")
                    .try_parsing(true),
            );
        for (key, value) in overrides {
            builder = builder.set_override(*key, value.clone())?;
        }

        let config = builder
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}
