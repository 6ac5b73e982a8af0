//! Repeated passes over an unchanged tree

use std::sync::Arc;

use bucketsync_core::domain::MarkerPolicy;
use bucketsync_core::ports::InMemoryObjectStore;

use crate::common::{engine, local_tree, marker_keys, target, write_file};

#[tokio::test]
async fn test_second_pass_uploads_nothing_and_rewrites_markers() {
    let dir = local_tree(&["a.txt", "sub/b.txt", "sub/deep/c.txt"]);
    let store = Arc::new(InMemoryObjectStore::new());
    let engine = engine(&store, target(dir.path(), "p", MarkerPolicy::PerSubdirectory, false));

    let first = engine.run_pass().await.unwrap();
    let puts_after_first = store.put_count();
    let second = engine.run_pass().await.unwrap();

    assert_eq!(first.uploaded, 3);
    assert_eq!(second.uploaded, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(second.markers_written, first.markers_written);
    // only the two markers are re-put
    assert_eq!(store.put_count() - puts_after_first, 2);
    assert_eq!(marker_keys(&store), vec!["p/sub/deep/syncd.txt", "p/sub/syncd.txt"]);
    assert_ne!(first.pass_id, second.pass_id);
}

#[tokio::test]
async fn test_existing_remote_content_is_never_replaced() {
    let dir = local_tree(&["sub/b.txt"]);
    let store = Arc::new(InMemoryObjectStore::new());
    store.insert("sub/b.txt", "truncated");

    engine(&store, target(dir.path(), "", MarkerPolicy::Strict, false))
        .run_pass()
        .await
        .unwrap();

    assert_eq!(store.get("sub/b.txt").unwrap().data, b"truncated");
}

#[tokio::test]
async fn test_new_local_file_is_picked_up_by_next_pass() {
    let dir = local_tree(&["sub/b.txt"]);
    let store = Arc::new(InMemoryObjectStore::new());
    let engine = engine(&store, target(dir.path(), "", MarkerPolicy::Strict, false));

    engine.run_pass().await.unwrap();
    write_file(dir.path(), "sub/new.txt");
    let report = engine.run_pass().await.unwrap();

    assert_eq!(report.uploaded, 1);
    assert_eq!(report.skipped, 1);
    assert!(store.contains("sub/new.txt"));
}
