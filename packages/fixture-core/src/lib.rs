//! Shared model for fixture harnesses.
//!
//! This crate defines the pieces every other crate in the workspace agrees
//! on: the [`Entity`] record, the [`DocumentStore`] capability a backing
//! store must provide, the [`StoreError`] failure mode, and helpers for
//! minting collision-free identifiers.

pub mod entity;
pub mod error;
pub mod id;
pub mod store;

pub use entity::Entity;
pub use error::{StoreError, StoreResult};
pub use id::scoped_id;
pub use store::DocumentStore;
