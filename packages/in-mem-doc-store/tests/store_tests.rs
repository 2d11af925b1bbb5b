//! Behavioral tests for the deferred-visibility store.

use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use serde_json::json;

use fixture_core::{DocumentStore, Entity, StoreError};
use in_mem_doc_store::{InMemDocStore, MemStoreConfig};

fn lagged(visibility_lag_ms: u64) -> InMemDocStore {
    InMemDocStore::with_config(MemStoreConfig {
        visibility_lag_ms,
        publish_interval_ms: 2,
        auto_publish: true,
    })
}

#[tokio::test]
async fn writes_become_visible_without_intervention() {
    let store = lagged(10);
    store.put(&Entity::keyed("slow")).await.unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if store.get("slow").await.unwrap().is_some() {
            break;
        }
        assert!(
            Instant::now() < deadline,
            "write never became visible on its own"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

#[tokio::test]
async fn manual_mode_defers_an_entire_batch() {
    let store = InMemDocStore::with_config(MemStoreConfig::manual());
    for id in ["a", "b", "c"] {
        store.put(&Entity::keyed(id)).await.unwrap();
    }
    assert_eq!(store.visible_count(), 0);
    assert_eq!(store.pending_count(), 3);

    store.refresh();
    for id in ["a", "b", "c"] {
        assert!(store.get(id).await.unwrap().is_some());
    }
}

#[tokio::test]
async fn deletes_lag_like_writes() {
    let store = InMemDocStore::with_config(MemStoreConfig::manual());
    store.put(&Entity::keyed("doomed")).await.unwrap();
    store.refresh();

    store.delete("doomed").await.unwrap();
    assert!(
        store.get("doomed").await.unwrap().is_some(),
        "delete should not be visible before publication"
    );

    store.refresh();
    assert_eq!(store.get("doomed").await.unwrap(), None);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let store = InMemDocStore::with_config(MemStoreConfig::immediate());

    store.delete("never-existed").await.unwrap();
    store.delete("never-existed").await.unwrap();

    store.put(&Entity::keyed("once")).await.unwrap();
    store.delete("once").await.unwrap();
    store.delete("once").await.unwrap();
    assert_eq!(store.get("once").await.unwrap(), None);
}

#[tokio::test]
async fn query_forms() {
    let store = InMemDocStore::with_config(MemStoreConfig::immediate());
    store
        .put(&Entity::new("order-1", json!({ "status": "pending" })))
        .await
        .unwrap();
    store
        .put(&Entity::new("order-2", json!({ "status": "shipped" })))
        .await
        .unwrap();
    store
        .put(&Entity::new("invoice-9", json!({ "status": "pending" })))
        .await
        .unwrap();

    let all = store.query("*").await.unwrap();
    let ids: Vec<&str> = all.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["invoice-9", "order-1", "order-2"]);

    let exact = store.query("id:order-2").await.unwrap();
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].id, "order-2");

    let pending = store.query("pending").await.unwrap();
    let ids: Vec<&str> = pending.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["invoice-9", "order-1"]);

    assert_eq!(store.query("").await.unwrap().len(), 3);
}

#[tokio::test]
async fn offline_store_fails_every_operation() {
    let store = InMemDocStore::with_config(MemStoreConfig::immediate());
    store.put(&Entity::keyed("kept")).await.unwrap();

    store.set_offline(true);
    assert!(matches!(
        store.put(&Entity::keyed("x")).await,
        Err(StoreError::Unavailable(_))
    ));
    assert!(matches!(
        store.get("kept").await,
        Err(StoreError::Unavailable(_))
    ));
    assert!(matches!(
        store.delete("kept").await,
        Err(StoreError::Unavailable(_))
    ));
    assert!(matches!(
        store.query("*").await,
        Err(StoreError::Unavailable(_))
    ));

    store.set_offline(false);
    assert!(
        store.get("kept").await.unwrap().is_some(),
        "documents survive the outage"
    );
}
