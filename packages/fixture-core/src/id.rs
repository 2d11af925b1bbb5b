//! Identifier helpers for scenario isolation.

use uuid::Uuid;

/// Returns an identifier unique across concurrently running scenarios.
///
/// Fixtures sharing one store are isolated purely by convention: their
/// batches must not overlap in ids. The prefix keeps ids readable in store
/// dumps, the random suffix keeps them from colliding.
pub fn scoped_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}
