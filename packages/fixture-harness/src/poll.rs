//! Bounded polling until a condition holds for every subject.

use std::future::Future;
use std::time::{Duration, Instant};

use fixture_core::{StoreError, StoreResult};

use crate::config::PollConfig;

/// Why a bounded wait ended without success.
#[derive(Debug)]
pub(crate) enum WaitError {
    /// The deadline passed with these subjects still unsatisfied.
    Deadline {
        waited: Duration,
        unsatisfied: Vec<String>,
    },
    /// A probe failed; the wait stops immediately rather than retrying into
    /// a dead store.
    Store(StoreError),
}

/// Polls `probe` for every id until all report true or the deadline passes.
///
/// The first round runs immediately. The delay between rounds starts at the
/// configured interval, grows by the backoff factor up to the configured
/// ceiling, and is shortened at the end so the final round lands on the
/// deadline instead of overshooting it. Ids that have already satisfied the
/// probe are not polled again.
pub(crate) async fn wait_for_all<F, Fut>(
    config: &PollConfig,
    ids: &[String],
    mut probe: F,
) -> Result<(), WaitError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = StoreResult<bool>>,
{
    let started = Instant::now();
    let deadline = started + config.max_wait();
    let mut interval = config.interval();
    let mut remaining: Vec<String> = ids.to_vec();

    loop {
        let mut unsatisfied = Vec::with_capacity(remaining.len());
        for id in remaining {
            match probe(id.clone()).await {
                Ok(true) => {}
                Ok(false) => unsatisfied.push(id),
                Err(err) => return Err(WaitError::Store(err)),
            }
        }
        if unsatisfied.is_empty() {
            return Ok(());
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(WaitError::Deadline {
                waited: now - started,
                unsatisfied,
            });
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
        interval = next_interval(config, interval);
        remaining = unsatisfied;
    }
}

/// Applies the backoff factor to the current delay, capped at the
/// configured ceiling. Factors at or below 1.0 keep the delay fixed, and a
/// product the clock cannot represent (a non-finite or absurdly large
/// factor) collapses to the ceiling instead of panicking mid-wait.
fn next_interval(config: &PollConfig, current: Duration) -> Duration {
    if config.backoff_factor <= 1.0 {
        return current;
    }
    let ceiling = config.max_interval();
    match Duration::try_from_secs_f64(current.as_secs_f64() * config.backoff_factor) {
        Ok(scaled) => scaled.min(ceiling),
        Err(_) => ceiling,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[tokio::test]
    async fn returns_once_every_probe_passes() {
        let calls = Cell::new(0u32);
        let result = wait_for_all(&PollConfig::fixed(1, 2000), &ids(&["a"]), |_id| {
            calls.set(calls.get() + 1);
            let satisfied = calls.get() >= 3;
            async move { Ok(satisfied) }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn satisfied_ids_are_not_polled_again() {
        let polled_good = Cell::new(0u32);
        let result = wait_for_all(&PollConfig::fixed(1, 40), &ids(&["good", "bad"]), |id| {
            if id == "good" {
                polled_good.set(polled_good.get() + 1);
            }
            async move { Ok(id == "good") }
        })
        .await;
        assert!(matches!(result, Err(WaitError::Deadline { .. })));
        assert_eq!(polled_good.get(), 1);
    }

    #[tokio::test]
    async fn deadline_reports_the_stragglers() {
        let result = wait_for_all(
            &PollConfig::fixed(5, 40),
            &ids(&["seen", "lost-1", "lost-2"]),
            |id| async move { Ok(id == "seen") },
        )
        .await;
        match result {
            Err(WaitError::Deadline {
                waited,
                unsatisfied,
            }) => {
                assert_eq!(unsatisfied, ids(&["lost-1", "lost-2"]));
                assert!(waited >= Duration::from_millis(40));
            }
            other => panic!("expected deadline, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn wait_is_bounded_even_with_backoff() {
        let config = PollConfig {
            interval_ms: 30,
            backoff_factor: 3.0,
            max_interval_ms: 500,
            max_wait_ms: 100,
        };
        let started = Instant::now();
        let result = wait_for_all(&config, &ids(&["never"]), |_id| async move { Ok(false) }).await;
        let elapsed = started.elapsed();
        assert!(matches!(result, Err(WaitError::Deadline { .. })));
        assert!(elapsed >= Duration::from_millis(100));
        assert!(
            elapsed < Duration::from_secs(2),
            "deadline overshot: {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn store_failure_stops_the_wait() {
        let result = wait_for_all(&PollConfig::fixed(5, 5000), &ids(&["a"]), |_id| async move {
            Err(StoreError::Unavailable("gone".to_string()))
        })
        .await;
        match result {
            Err(WaitError::Store(StoreError::Unavailable(reason))) => {
                assert_eq!(reason, "gone");
            }
            other => panic!("expected store error, got {:?}", other),
        }
    }

    #[test]
    fn backoff_grows_until_the_ceiling() {
        let config = PollConfig {
            interval_ms: 10,
            backoff_factor: 2.0,
            max_interval_ms: 40,
            max_wait_ms: 1000,
        };
        let first = next_interval(&config, config.interval());
        let second = next_interval(&config, first);
        let third = next_interval(&config, second);
        assert_eq!(first, Duration::from_millis(20));
        assert_eq!(second, Duration::from_millis(40));
        assert_eq!(third, Duration::from_millis(40));
    }

    #[test]
    fn absurd_backoff_factors_collapse_to_the_ceiling() {
        fn with_factor(backoff_factor: f64) -> PollConfig {
            PollConfig {
                interval_ms: 25,
                backoff_factor,
                max_interval_ms: 200,
                max_wait_ms: 1000,
            }
        }
        for factor in [f64::INFINITY, f64::NAN, 1e308] {
            let config = with_factor(factor);
            assert_eq!(
                next_interval(&config, config.interval()),
                Duration::from_millis(200),
                "factor {} must not escape the ceiling",
                factor
            );
        }
    }
}
