//! Deferred-visibility store implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use fixture_core::{DocumentStore, Entity, StoreError, StoreResult};

use crate::config::MemStoreConfig;
use crate::query;

/// One accepted but not yet visible operation.
#[derive(Debug, Clone)]
enum PendingOp {
    Put { entity: Entity, due: Instant },
    Delete { id: String, due: Instant },
}

impl PendingOp {
    fn due(&self) -> Instant {
        match self {
            PendingOp::Put { due, .. } | PendingOp::Delete { due, .. } => *due,
        }
    }
}

/// State shared between the store handle and its publisher task.
struct Shared {
    /// Snapshot served to readers, swapped wholesale on publish.
    visible: ArcSwap<HashMap<String, Entity>>,
    /// Accepted operations waiting out their visibility lag, in arrival
    /// order.
    pending: Mutex<Vec<PendingOp>>,
    /// Connectivity fault toggle.
    offline: AtomicBool,
}

/// In-memory document store whose writes become visible after a delay.
///
/// `put` and `delete` are acknowledged right away but only queued; readers
/// keep seeing the previous snapshot until the operations are published.
/// With auto-publish on, a background task publishes every operation once
/// its visibility lag has passed. In manual mode nothing is published until
/// [`refresh`](InMemDocStore::refresh) is called.
pub struct InMemDocStore {
    shared: Arc<Shared>,
    config: MemStoreConfig,
    publisher: Option<JoinHandle<()>>,
}

impl InMemDocStore {
    /// Creates a store with the default configuration.
    ///
    /// Note: with auto-publish enabled this must be called inside a Tokio
    /// runtime, since the publisher runs as a spawned task.
    pub fn new() -> Self {
        Self::with_config(MemStoreConfig::default())
    }

    /// Creates a store with the given configuration.
    pub fn with_config(config: MemStoreConfig) -> Self {
        let shared = Arc::new(Shared {
            visible: ArcSwap::from_pointee(HashMap::new()),
            pending: Mutex::new(Vec::new()),
            offline: AtomicBool::new(false),
        });
        let publisher = if config.auto_publish {
            let shared = Arc::clone(&shared);
            let interval = config.publish_interval();
            Some(tokio::spawn(async move {
                loop {
                    tokio::time::sleep(interval).await;
                    publish(&shared, Some(Instant::now()));
                }
            }))
        } else {
            None
        };
        Self {
            shared,
            config,
            publisher,
        }
    }

    /// Publishes every pending operation regardless of its due time, like
    /// forcing an index refresh between test steps.
    pub fn refresh(&self) {
        publish(&self.shared, None);
        tracing::debug!(
            "refresh published all pending operations, {} documents visible",
            self.shared.visible.load().len()
        );
    }

    /// Switches the connectivity fault on or off. While offline every store
    /// operation fails with [`StoreError::Unavailable`]; queued operations
    /// and visible documents survive the outage.
    pub fn set_offline(&self, offline: bool) {
        self.shared.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of currently visible documents.
    pub fn visible_count(&self) -> usize {
        self.shared.visible.load().len()
    }

    /// Number of accepted operations not yet published.
    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().len()
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.shared.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store is offline".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for InMemDocStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InMemDocStore {
    fn drop(&mut self) {
        if let Some(publisher) = self.publisher.take() {
            publisher.abort();
        }
    }
}

/// Applies pending operations to the visible snapshot.
///
/// With a cutoff only operations due by that instant are applied; without
/// one everything pending is. The queue is in arrival order and due
/// instants are non-decreasing, so the due operations are exactly a prefix.
/// Applying happens under the pending lock so concurrent publishers cannot
/// tear the snapshot.
fn publish(shared: &Shared, cutoff: Option<Instant>) {
    let mut pending = shared.pending.lock();
    let split = match cutoff {
        Some(now) => pending
            .iter()
            .position(|op| op.due() > now)
            .unwrap_or(pending.len()),
        None => pending.len(),
    };
    if split == 0 {
        return;
    }
    let mut next = (*shared.visible.load_full()).clone();
    for op in pending.drain(..split) {
        match op {
            PendingOp::Put { entity, .. } => {
                next.insert(entity.id.clone(), entity);
            }
            PendingOp::Delete { id, .. } => {
                next.remove(&id);
            }
        }
    }
    let visible = next.len();
    shared.visible.store(Arc::new(next));
    tracing::trace!("published {} operations, {} documents visible", split, visible);
}

#[async_trait]
impl DocumentStore for InMemDocStore {
    async fn put(&self, entity: &Entity) -> StoreResult<()> {
        self.check_online()?;
        let due = Instant::now() + self.config.visibility_lag();
        self.shared.pending.lock().push(PendingOp::Put {
            entity: entity.clone(),
            due,
        });
        if self.config.auto_publish && self.config.visibility_lag_ms == 0 {
            publish(&self.shared, Some(Instant::now()));
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Entity>> {
        self.check_online()?;
        Ok(self.shared.visible.load().get(id).cloned())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.check_online()?;
        let due = Instant::now() + self.config.visibility_lag();
        self.shared.pending.lock().push(PendingOp::Delete {
            id: id.to_string(),
            due,
        });
        if self.config.auto_publish && self.config.visibility_lag_ms == 0 {
            publish(&self.shared, Some(Instant::now()));
        }
        Ok(())
    }

    async fn query(&self, raw: &str) -> StoreResult<Vec<Entity>> {
        self.check_online()?;
        let parsed = query::parse(raw);
        let snapshot = self.shared.visible.load();
        let mut hits: Vec<Entity> = snapshot
            .values()
            .filter(|entity| query::matches(parsed, entity))
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(hits)
    }
}
