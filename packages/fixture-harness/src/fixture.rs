//! Fixture lifecycle bracketing.

use std::any::Any;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::task::JoinSet;

use fixture_core::{DocumentStore, Entity, StoreError, StoreResult};

use crate::config::FixtureConfig;
use crate::error::{FixtureError, Result};
use crate::poll::{self, WaitError};

/// Phases of one fixture run, in order. A manager between runs is simply
/// not in any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Submitting the batch to the store.
    Staging,
    /// Polling until every staged entity is readable.
    AwaitingVisible,
    /// The caller's action is running.
    Running,
    /// Submitting deletes for the batch.
    TearingDown,
    /// Polling until every entity is gone.
    AwaitingAbsent,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Staging => "staging",
            Phase::AwaitingVisible => "awaiting-visible",
            Phase::Running => "running",
            Phase::TearingDown => "tearing-down",
            Phase::AwaitingAbsent => "awaiting-absent",
        };
        f.write_str(name)
    }
}

/// Brackets test actions with guaranteed staging and guaranteed cleanup
/// against a shared document store.
///
/// The manager owns no entities between runs; every call to
/// [`run_with_fixture`](FixtureManager::run_with_fixture) stages its own
/// batch and removes it again before returning.
pub struct FixtureManager<S: ?Sized> {
    store: Arc<S>,
    config: FixtureConfig,
}

impl<S> FixtureManager<S>
where
    S: DocumentStore + ?Sized + 'static,
{
    /// Creates a manager with the default configuration.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, FixtureConfig::default())
    }

    /// Creates a manager with the given configuration.
    pub fn with_config(store: Arc<S>, config: FixtureConfig) -> Self {
        Self { store, config }
    }

    /// The configuration this manager runs with.
    pub fn config(&self) -> &FixtureConfig {
        &self.config
    }

    /// Runs `action` with `entities` staged in the store.
    ///
    /// The batch is written and polled until every entity is visible, the
    /// action runs with the batch it was promised, and the batch is deleted
    /// and polled until every entity is absent again. Teardown runs whether
    /// the action succeeded, returned an error or panicked; a panic is
    /// contained and reported like any other action failure. If both the
    /// action and teardown fail, the action failure is returned and the
    /// teardown failure rides along inside it.
    ///
    /// When setup cannot complete, the action is never invoked and a
    /// best-effort cleanup removes whatever was already written.
    ///
    /// Ids within a batch must be unique; concurrent runs against one store
    /// must use disjoint ids, which [`scoped_id`](fixture_core::scoped_id)
    /// exists for.
    pub async fn run_with_fixture<A, Fut>(&self, entities: Vec<Entity>, action: A) -> Result<()>
    where
        A: FnOnce(Vec<Entity>) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        if entities.is_empty() {
            return Err(FixtureError::EmptyBatch);
        }
        let ids: Vec<String> = entities.iter().map(|entity| entity.id.clone()).collect();

        if let Err(err) = self.stage(&entities, &ids).await {
            self.cleanup_after_failed_setup(&ids).await;
            return Err(err);
        }

        tracing::debug!("phase {}, batch of {}", Phase::Running, ids.len());
        // The closure can panic before it ever hands back a future; contain
        // that half here, run_action contains the future half.
        let action_result = match catch_unwind(AssertUnwindSafe(|| action(entities))) {
            Ok(fut) => run_action(fut).await,
            Err(payload) => Err(anyhow::anyhow!(
                "action panicked: {}",
                panic_message(payload)
            )),
        };
        if let Err(error) = &action_result {
            tracing::debug!("action failed: {:#}", error);
        }

        let teardown_result = self.teardown(&ids).await;

        match (action_result, teardown_result) {
            (Ok(()), Ok(())) => {
                tracing::debug!("fixture completed cleanly");
                Ok(())
            }
            (Ok(()), Err(teardown_err)) => Err(teardown_err),
            (Err(error), Ok(())) => Err(FixtureError::Action {
                error,
                teardown: None,
            }),
            (Err(error), Err(teardown_err)) => {
                tracing::warn!("teardown failed after action failure: {}", teardown_err);
                Err(FixtureError::Action {
                    error,
                    teardown: Some(Box::new(teardown_err)),
                })
            }
        }
    }

    async fn stage(&self, entities: &[Entity], ids: &[String]) -> Result<()> {
        tracing::debug!("phase {}, batch of {}", Phase::Staging, entities.len());
        self.submit_puts(entities).await?;

        tracing::debug!("phase {}", Phase::AwaitingVisible);
        let store = &self.store;
        let outcome = poll::wait_for_all(&self.config.setup, ids, |id| {
            let store = Arc::clone(store);
            async move { Ok(store.get(&id).await?.is_some()) }
        })
        .await;
        match outcome {
            Ok(()) => Ok(()),
            Err(WaitError::Deadline {
                waited,
                unsatisfied,
            }) => Err(FixtureError::SetupTimeout {
                waited_ms: waited.as_millis() as u64,
                missing: unsatisfied,
            }),
            Err(WaitError::Store(err)) => Err(FixtureError::Store(err)),
        }
    }

    async fn teardown(&self, ids: &[String]) -> Result<()> {
        tracing::debug!("phase {}, batch of {}", Phase::TearingDown, ids.len());
        self.submit_deletes(ids).await?;

        tracing::debug!("phase {}", Phase::AwaitingAbsent);
        let store = &self.store;
        let outcome = poll::wait_for_all(&self.config.teardown, ids, |id| {
            let store = Arc::clone(store);
            async move { Ok(store.get(&id).await?.is_none()) }
        })
        .await;
        match outcome {
            Ok(()) => Ok(()),
            Err(WaitError::Deadline {
                waited,
                unsatisfied,
            }) => Err(FixtureError::TeardownTimeout {
                waited_ms: waited.as_millis() as u64,
                remaining: unsatisfied,
            }),
            Err(WaitError::Store(err)) => Err(FixtureError::Store(err)),
        }
    }

    /// Removes whatever a failed setup may have written. The setup error is
    /// already decided; problems here are logged, not surfaced.
    async fn cleanup_after_failed_setup(&self, ids: &[String]) {
        if let Err(err) = self.teardown(ids).await {
            tracing::warn!("best-effort cleanup after failed setup: {}", err);
        }
    }

    async fn submit_puts(&self, entities: &[Entity]) -> Result<()> {
        if self.config.concurrent_dispatch {
            let mut tasks = JoinSet::new();
            for entity in entities {
                let store = Arc::clone(&self.store);
                let entity = entity.clone();
                tasks.spawn(async move { store.put(&entity).await });
            }
            join_all_ops(tasks).await
        } else {
            for entity in entities {
                self.store.put(entity).await?;
            }
            Ok(())
        }
    }

    async fn submit_deletes(&self, ids: &[String]) -> Result<()> {
        if self.config.concurrent_dispatch {
            let mut tasks = JoinSet::new();
            for id in ids {
                let store = Arc::clone(&self.store);
                let id = id.clone();
                tasks.spawn(async move { store.delete(&id).await });
            }
            join_all_ops(tasks).await
        } else {
            for id in ids {
                self.store.delete(id).await?;
            }
            Ok(())
        }
    }
}

/// Waits for every submitted store task. All tasks run to completion; the
/// first failure becomes the result.
async fn join_all_ops(mut tasks: JoinSet<StoreResult<()>>) -> Result<()> {
    let mut first_error: Option<FixtureError> = None;
    while let Some(joined) = tasks.join_next().await {
        let outcome = match joined {
            Ok(op_result) => op_result.map_err(FixtureError::from),
            Err(join_err) => Err(FixtureError::Store(StoreError::Unavailable(format!(
                "store task did not complete: {}",
                join_err
            )))),
        };
        if let Err(err) = outcome {
            if first_error.is_none() {
                first_error = Some(err);
            }
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Runs the action on its own task so a panic is contained and teardown
/// still gets its turn.
async fn run_action<Fut>(action: Fut) -> anyhow::Result<()>
where
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    match tokio::spawn(action).await {
        Ok(result) => result,
        Err(join_err) if join_err.is_panic() => Err(anyhow::anyhow!(
            "action panicked: {}",
            panic_message(join_err.into_panic())
        )),
        Err(join_err) => Err(anyhow::anyhow!("action task aborted: {}", join_err)),
    }
}

/// Renders a panic payload for the action-failure report.
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
