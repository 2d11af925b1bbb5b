//! Scoped setup/teardown fixtures for eventually-consistent document
//! stores.
//!
//! Tests against a store whose reads lag its writes keep reinventing the
//! same bracket: write the fixture entities, poll until they are really
//! visible, run the assertion, then delete everything and poll until it is
//! really gone. [`FixtureManager`] owns that bracket. The action runs only
//! once its data is readable, cleanup runs no matter how the action ends,
//! and an action failure is never masked by a cleanup failure that follows
//! it.
//!
//! The store side of the contract is the
//! [`DocumentStore`](fixture_core::DocumentStore) trait; any
//! implementation with eventually-consistent reads and idempotent deletes
//! fits.

pub mod config;
pub mod error;
pub mod fixture;
mod poll;

pub use config::{ConfigError, FixtureConfig, PollConfig};
pub use error::{FixtureError, Result};
pub use fixture::{FixtureManager, Phase};
