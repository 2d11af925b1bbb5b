//! Entity record shared by stores and fixtures.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single identifiable record submitted to a document store.
///
/// The identifier addresses the record; the payload is an opaque JSON
/// document the store hands back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Identifier, unique within a batch.
    pub id: String,
    /// Opaque document body.
    pub payload: Value,
}

impl Entity {
    /// Creates an entity from an identifier and a payload document.
    pub fn new(id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }

    /// Creates an entity whose payload is just its own identifier.
    ///
    /// Covers the common case where a staged document carries no data beyond
    /// the key used to look it up.
    pub fn keyed(id: impl Into<String>) -> Self {
        let id = id.into();
        let payload = Value::String(id.clone());
        Self { id, payload }
    }
}
