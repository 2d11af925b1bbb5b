//! Store capability consumed by the fixture harness.

use async_trait::async_trait;

use crate::entity::Entity;
use crate::error::StoreResult;

/// Key-addressable document store with eventually-consistent reads.
///
/// The harness relies on nothing beyond this contract; whether the store is
/// a remote search cluster or an in-process test double is the
/// implementor's business. Reads are allowed to lag writes: a `put`
/// followed immediately by a `get` of the same id may return `None` until
/// the store publishes the write. Callers that need read-your-writes must
/// poll.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Submits an entity, overwriting any previous document under the same
    /// id.
    async fn put(&self, entity: &Entity) -> StoreResult<()>;

    /// Fetches the visible document for `id`, or `None` while it is absent.
    async fn get(&self, id: &str) -> StoreResult<Option<Entity>>;

    /// Removes the document for `id`. Deleting an absent id succeeds.
    async fn delete(&self, id: &str) -> StoreResult<()>;

    /// Runs a free-text query over the visible documents.
    ///
    /// The harness itself never queries; scenario actions do.
    async fn query(&self, query: &str) -> StoreResult<Vec<Entity>>;
}
