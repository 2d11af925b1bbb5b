//! Store tuning.

use std::time::Duration;

use thiserror::Error;

/// Error raised when an environment override cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The variable was set but did not parse as the expected type.
    #[error("invalid value for {key}: {value}")]
    EnvOverride { key: &'static str, value: String },
}

/// Tuning for the deferred-visibility model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemStoreConfig {
    /// Delay before a submitted operation becomes readable (default: 20)
    pub visibility_lag_ms: u64,
    /// How often the background publisher applies due operations (default: 5)
    pub publish_interval_ms: u64,
    /// When false nothing is published until `refresh` is called (default: true)
    pub auto_publish: bool,
}

impl Default for MemStoreConfig {
    fn default() -> Self {
        Self {
            visibility_lag_ms: 20,
            publish_interval_ms: 5,
            auto_publish: true,
        }
    }
}

impl MemStoreConfig {
    /// Configuration with no visibility lag. Writes are readable as soon as
    /// the submitting call returns.
    pub fn immediate() -> Self {
        Self {
            visibility_lag_ms: 0,
            publish_interval_ms: 1,
            auto_publish: true,
        }
    }

    /// Configuration where nothing becomes visible on its own. Tests drive
    /// publication explicitly through `refresh`.
    pub fn manual() -> Self {
        Self {
            auto_publish: false,
            ..Self::default()
        }
    }

    /// Applies `MEMSTORE_*` environment overrides to this configuration.
    ///
    /// Recognized variables are `MEMSTORE_VISIBILITY_LAG_MS`,
    /// `MEMSTORE_PUBLISH_INTERVAL_MS` and `MEMSTORE_AUTO_PUBLISH`.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = std::env::var("MEMSTORE_VISIBILITY_LAG_MS") {
            self.visibility_lag_ms = parse_env("MEMSTORE_VISIBILITY_LAG_MS", &value)?;
        }
        if let Ok(value) = std::env::var("MEMSTORE_PUBLISH_INTERVAL_MS") {
            self.publish_interval_ms = parse_env("MEMSTORE_PUBLISH_INTERVAL_MS", &value)?;
        }
        if let Ok(value) = std::env::var("MEMSTORE_AUTO_PUBLISH") {
            self.auto_publish = parse_env("MEMSTORE_AUTO_PUBLISH", &value)?;
        }
        Ok(())
    }

    /// Visibility lag as a duration.
    pub fn visibility_lag(&self) -> Duration {
        Duration::from_millis(self.visibility_lag_ms)
    }

    /// Publisher tick as a duration. Never zero, so the publisher cannot
    /// busy-spin.
    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms.max(1))
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::EnvOverride {
        key,
        value: value.to_string(),
    })
}
