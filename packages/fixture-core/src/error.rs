//! Store failure mode.

use thiserror::Error;

/// Failure surfaced by a [`DocumentStore`](crate::DocumentStore) operation.
///
/// Losing the store is the only failure the contract admits. Everything
/// else a caller might wonder about (missing documents, reads lagging
/// writes) is expressed through the normal return values, never as an
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store cannot currently be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
