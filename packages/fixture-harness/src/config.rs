//! Harness configuration.
//!
//! Defaults suit an in-process store; against a real cluster the polling
//! windows usually come from a TOML file or `FIXTURE_*` environment
//! overrides, checked in that order.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or persisting harness configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Read(#[source] std::io::Error),
    /// The config file could not be written.
    #[error("failed to write config file: {0}")]
    Write(#[source] std::io::Error),
    /// The file contents were not valid TOML for this schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// An environment override did not parse as the expected type.
    #[error("invalid value for {key}: {value}")]
    EnvOverride { key: String, value: String },
}

/// Polling behavior for one wait phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Delay between polling rounds, in milliseconds (default: 25)
    pub interval_ms: u64,
    /// Multiplier applied to the delay after each round; 1.0 keeps it fixed
    /// (default: 1.0)
    pub backoff_factor: f64,
    /// Ceiling the backed-off delay never exceeds, in milliseconds
    /// (default: 1000)
    pub max_interval_ms: u64,
    /// Total time budget for the phase, in milliseconds (default: 5000)
    pub max_wait_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 25,
            backoff_factor: 1.0,
            max_interval_ms: 1000,
            max_wait_ms: 5000,
        }
    }
}

impl PollConfig {
    /// Fixed-interval polling with the given delay and budget.
    pub fn fixed(interval_ms: u64, max_wait_ms: u64) -> Self {
        Self {
            interval_ms,
            backoff_factor: 1.0,
            max_interval_ms: interval_ms,
            max_wait_ms,
        }
    }

    /// Delay between rounds. Never zero, so polling cannot busy-spin.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    /// Backoff ceiling. Never below the base interval.
    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms.max(self.interval_ms.max(1)))
    }

    /// Total budget for the phase.
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

/// Configuration for a fixture manager.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// Polling for the await-visible phase after staging.
    pub setup: PollConfig,
    /// Polling for the await-absent phase after deletion.
    pub teardown: PollConfig,
    /// Issue the puts and deletes of a batch concurrently instead of one at
    /// a time (default: false)
    pub concurrent_dispatch: bool,
}

impl FixtureConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from a TOML string. Missing fields keep their
    /// defaults.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Writes this configuration to a TOML file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(ConfigError::Write)
    }

    /// Applies `FIXTURE_*` environment overrides to this configuration.
    ///
    /// Each poll field is addressable per phase, for example
    /// `FIXTURE_SETUP_MAX_WAIT_MS` or `FIXTURE_TEARDOWN_INTERVAL_MS`, plus
    /// `FIXTURE_CONCURRENT_DISPATCH` for the dispatch mode.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        apply_poll_env(&mut self.setup, "SETUP")?;
        apply_poll_env(&mut self.teardown, "TEARDOWN")?;
        if let Some(value) = env_override("FIXTURE_CONCURRENT_DISPATCH")? {
            self.concurrent_dispatch = value;
        }
        Ok(())
    }
}

fn apply_poll_env(poll: &mut PollConfig, phase: &str) -> Result<(), ConfigError> {
    if let Some(value) = env_override(&format!("FIXTURE_{}_INTERVAL_MS", phase))? {
        poll.interval_ms = value;
    }
    if let Some(value) = env_override(&format!("FIXTURE_{}_BACKOFF_FACTOR", phase))? {
        poll.backoff_factor = value;
    }
    if let Some(value) = env_override(&format!("FIXTURE_{}_MAX_INTERVAL_MS", phase))? {
        poll.max_interval_ms = value;
    }
    if let Some(value) = env_override(&format!("FIXTURE_{}_MAX_WAIT_MS", phase))? {
        poll.max_wait_ms = value;
    }
    Ok(())
}

fn env_override<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value.parse().map(Some).map_err(|_| ConfigError::EnvOverride {
            key: key.to_string(),
            value,
        }),
        Err(_) => Ok(None),
    }
}
