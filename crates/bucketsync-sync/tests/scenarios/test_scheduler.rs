//! Scheduler driving a real engine

use std::sync::Arc;
use std::time::Duration;

use bucketsync_core::domain::MarkerPolicy;
use bucketsync_core::ports::InMemoryObjectStore;
use bucketsync_sync::{RetryPolicy, RetryingStore, SyncEngine, SyncScheduler};
use tokio_util::sync::CancellationToken;

use crate::common::{local_tree, target};

#[tokio::test(start_paused = true)]
async fn test_slow_store_never_runs_two_passes_at_once() {
    let dir = local_tree(&["sub/1.txt", "sub/2.txt"]);
    let store = Arc::new(InMemoryObjectStore::new());
    // 2 files x (upload lookup + put + verify lookup) + 1 marker put, 1s each
    store.set_delay(Duration::from_secs(1));

    let engine = SyncEngine::new(
        store.clone(),
        Arc::new(target(dir.path(), "", MarkerPolicy::Strict, false)),
    );
    let cancel = CancellationToken::new();
    let scheduler = SyncScheduler::new(
        Arc::new(engine),
        Some(Duration::from_secs(2)),
        cancel.clone(),
    );

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        canceller.cancel();
    });
    let summary = scheduler.run().await.unwrap();

    assert!(summary.ticks_skipped > 0);
    assert_eq!(summary.passes_failed, 0);
    assert_eq!(summary.passes_started, summary.passes_succeeded);
    assert!(store.contains("sub/syncd.txt"));
}

#[tokio::test(start_paused = true)]
async fn test_hung_store_times_out_and_next_tick_runs() {
    let dir = local_tree(&["sub/1.txt"]);
    let inner = Arc::new(InMemoryObjectStore::new());
    inner.set_delay(Duration::from_secs(3600));
    let store = Arc::new(RetryingStore::new(
        inner.clone(),
        RetryPolicy::new(Duration::from_secs(1), 0),
    ));

    let engine = SyncEngine::new(
        store,
        Arc::new(target(dir.path(), "", MarkerPolicy::Strict, false)),
    );
    let cancel = CancellationToken::new();
    let scheduler = SyncScheduler::new(Arc::new(engine), Some(Duration::from_secs(5)), cancel.clone());

    let canceller = cancel.clone();
    let unblock = inner.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(7)).await;
        unblock.clear_faults();
        tokio::time::sleep(Duration::from_secs(5)).await;
        canceller.cancel();
    });
    let summary = scheduler.run().await.unwrap();

    assert!(summary.passes_failed >= 1);
    assert!(summary.passes_succeeded >= 1);
    assert!(inner.contains("sub/syncd.txt"));
}
