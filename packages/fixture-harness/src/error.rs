//! Fixture error taxonomy.

use fixture_core::StoreError;
use thiserror::Error;

/// Errors surfaced by a fixture run.
///
/// An action failure is always the primary error. Cleanup problems that
/// follow it are attached to the [`Action`](FixtureError::Action) variant
/// instead of replacing it, so the signal a failing test produced is never
/// masked by its own teardown.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// The batch handed to the harness contained no entities.
    #[error("fixture batch is empty")]
    EmptyBatch,

    /// Not every entity became visible before the setup deadline.
    #[error("setup timed out after {waited_ms} ms, never became visible: {missing:?}")]
    SetupTimeout {
        /// Total time spent polling, in milliseconds.
        waited_ms: u64,
        /// Ids that never showed up.
        missing: Vec<String>,
    },

    /// Not every entity became absent before the teardown deadline.
    #[error("teardown timed out after {waited_ms} ms, still visible: {remaining:?}")]
    TeardownTimeout {
        /// Total time spent polling, in milliseconds.
        waited_ms: u64,
        /// Ids that were still visible.
        remaining: Vec<String>,
    },

    /// The action returned an error or panicked.
    ///
    /// Teardown still ran. If it failed too, that failure rides along in
    /// `teardown` rather than replacing this error.
    #[error("fixture action failed: {error}")]
    Action {
        /// What the action reported, or a description of its panic.
        error: anyhow::Error,
        /// Secondary teardown failure, when cleanup after the failed action
        /// also went wrong.
        teardown: Option<Box<FixtureError>>,
    },

    /// Store failure, propagated unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FixtureError {
    /// Secondary teardown failure attached to an action failure, if any.
    pub fn teardown_error(&self) -> Option<&FixtureError> {
        match self {
            FixtureError::Action { teardown, .. } => teardown.as_deref(),
            _ => None,
        }
    }

    /// True when the action itself failed, as opposed to setup or teardown.
    pub fn is_action_failure(&self) -> bool {
        matches!(self, FixtureError::Action { .. })
    }
}

/// Result alias for fixture operations.
pub type Result<T> = std::result::Result<T, FixtureError>;
