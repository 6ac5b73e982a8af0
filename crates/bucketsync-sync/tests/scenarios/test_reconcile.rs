//! Reconciliation scenarios

use std::sync::Arc;

use bucketsync_core::domain::MarkerPolicy;
use bucketsync_core::ports::InMemoryObjectStore;

use crate::common::{engine, local_tree, target};

#[tokio::test]
async fn test_reconcile_deletes_orphans() {
    let dir = local_tree(&["a.txt", "sub/b.txt"]);
    let store = Arc::new(InMemoryObjectStore::new());
    store.insert("old/obsolete.txt", "gone locally");

    let report = engine(&store, target(dir.path(), "", MarkerPolicy::Strict, true))
        .run_pass()
        .await
        .unwrap();

    assert_eq!(report.deleted, 1);
    assert_eq!(
        store.deleted_batches(),
        vec![vec!["old/obsolete.txt".to_string()]]
    );
    assert!(!store.contains("old/obsolete.txt"));
    assert!(store.contains("sub/syncd.txt"));
}

#[tokio::test]
async fn test_default_mode_never_deletes() {
    let dir = local_tree(&["a.txt"]);
    let store = Arc::new(InMemoryObjectStore::new());
    store.insert("old/obsolete.txt", "gone locally");

    let engine = engine(&store, target(dir.path(), "", MarkerPolicy::Strict, false));
    engine.run_pass().await.unwrap();
    engine.run_pass().await.unwrap();

    assert_eq!(store.delete_batch_count(), 0);
    assert!(store.contains("old/obsolete.txt"));
}

#[tokio::test]
async fn test_reconcile_keeps_markers_and_sibling_prefixes() {
    let dir = local_tree(&["sub/b.txt"]);
    let store = Arc::new(InMemoryObjectStore::new());
    store.insert("data/removed/syncd.txt", "old marker");
    store.insert("data/removed/file.txt", "orphan");
    store.insert("data2/unrelated.txt", "other mirror");

    let report = engine(&store, target(dir.path(), "data", MarkerPolicy::Strict, true))
        .run_pass()
        .await
        .unwrap();

    assert_eq!(report.deleted, 1);
    assert!(!store.contains("data/removed/file.txt"));
    assert!(store.contains("data/removed/syncd.txt"));
    assert!(store.contains("data2/unrelated.txt"));
}

#[tokio::test]
async fn test_reconcile_does_not_run_after_failed_pass() {
    let dir = local_tree(&["sub/b.txt"]);
    let store = Arc::new(InMemoryObjectStore::new());
    store.insert("orphan.txt", "");
    store.fail_put(
        "sub/b.txt",
        bucketsync_core::ports::StoreError::Transport("reset".into()),
    );

    let result = engine(&store, target(dir.path(), "", MarkerPolicy::Strict, true))
        .run_pass()
        .await;

    assert!(result.is_err());
    assert_eq!(store.delete_batch_count(), 0);
    assert!(store.contains("orphan.txt"));
}
