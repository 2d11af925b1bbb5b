//! Measures the full fixture bracket (stage, await visible, noop action,
//! teardown, await absent) against a zero-lag store, so the numbers show
//! harness overhead rather than store latency.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use fixture_core::Entity;
use fixture_harness::{FixtureConfig, FixtureManager, PollConfig};
use in_mem_doc_store::{InMemDocStore, MemStoreConfig};

fn bench_fixture_bracket(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("bench runtime");

    let config = FixtureConfig {
        setup: PollConfig::fixed(1, 1000),
        teardown: PollConfig::fixed(1, 1000),
        ..Default::default()
    };
    let manager = rt.block_on(async {
        let store = Arc::new(InMemDocStore::with_config(MemStoreConfig::immediate()));
        FixtureManager::with_config(store, config)
    });

    let mut group = c.benchmark_group("fixture_bracket");
    for batch_size in [1usize, 4, 16] {
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch_size,
            |b, &size| {
                b.iter(|| {
                    rt.block_on(async {
                        let batch: Vec<Entity> = (0..size)
                            .map(|i| Entity::keyed(format!("bench-{}", i)))
                            .collect();
                        manager
                            .run_with_fixture(black_box(batch), |_batch| async { Ok(()) })
                            .await
                            .expect("bracket failed");
                    });
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_fixture_bracket);
criterion_main!(benches);
