//! In-memory [`DocumentStore`](fixture_core::DocumentStore) with deferred
//! visibility.
//!
//! Writes are queued and only become readable once published, which
//! reproduces the put-then-can't-get-yet window of a real search cluster
//! inside a unit test. Publication runs on a background task by default;
//! tests that need exact control can switch to manual mode and publish by
//! hand with [`InMemDocStore::refresh`]. A fault toggle simulates losing
//! the store entirely.

pub mod config;
mod query;
pub mod store;

pub use config::{ConfigError, MemStoreConfig};
pub use store::InMemDocStore;
