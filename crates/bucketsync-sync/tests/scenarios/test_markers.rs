//! Upload, verification and marker scenarios

use std::sync::Arc;

use bucketsync_core::domain::MarkerPolicy;
use bucketsync_core::ports::{InMemoryObjectStore, StoreError};
use bucketsync_sync::{Operation, SyncError};

use crate::common::{engine, local_tree, marker_keys, target};

#[tokio::test]
async fn test_fresh_tree_uploads_and_marks_subdirectory_only() {
    let dir = local_tree(&["a.txt", "sub/b.txt"]);
    let store = Arc::new(InMemoryObjectStore::new());

    let report = engine(&store, target(dir.path(), "", MarkerPolicy::Strict, false))
        .run_pass()
        .await
        .unwrap();

    assert_eq!(report.uploaded, 2);
    assert_eq!(
        store.keys(),
        vec!["a.txt", "sub/b.txt", "sub/syncd.txt"]
    );
    let marker = String::from_utf8(store.get("sub/syncd.txt").unwrap().data).unwrap();
    assert!(marker.starts_with("Synced at: "));
    assert_eq!(marker_keys(&store), vec!["sub/syncd.txt"]);
}

#[tokio::test]
async fn test_every_local_file_exists_remotely_after_pass() {
    let files = ["a.txt", "x/1.bin", "x/y/2.bin", "z/3.bin"];
    let dir = local_tree(&files);
    let store = Arc::new(InMemoryObjectStore::new());

    engine(&store, target(dir.path(), "mirror", MarkerPolicy::PerSubdirectory, false))
        .run_pass()
        .await
        .unwrap();

    for file in files {
        assert!(store.contains(&format!("mirror/{file}")), "{file} missing");
    }
    assert_eq!(
        marker_keys(&store),
        vec!["mirror/x/syncd.txt", "mirror/x/y/syncd.txt", "mirror/z/syncd.txt"]
    );
}

#[tokio::test]
async fn test_upload_failure_aborts_before_any_marker() {
    let dir = local_tree(&["a.txt", "sub/b.txt"]);
    let store = Arc::new(InMemoryObjectStore::new());
    store.fail_put("sub/b.txt", StoreError::Transport("connection reset".into()));

    let err = engine(&store, target(dir.path(), "", MarkerPolicy::Strict, false))
        .run_pass()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::Transport { operation: Operation::Put, ref key, .. } if key == "sub/b.txt"
    ));
    // the earlier upload is not rolled back
    assert_eq!(store.keys(), vec!["a.txt"]);
    assert!(marker_keys(&store).is_empty());
}

#[tokio::test]
async fn test_strict_policy_withholds_every_marker() {
    let dir = local_tree(&["good/1.txt", "bad/2.txt"]);
    let store = Arc::new(InMemoryObjectStore::new());
    store.hide_after_put("bad/2.txt");

    let report = engine(&store, target(dir.path(), "", MarkerPolicy::Strict, false))
        .run_pass()
        .await
        .unwrap();

    assert_eq!(report.gaps.len(), 1);
    assert_eq!(report.gaps[0].subdirectory.to_string(), "bad");
    assert_eq!(report.markers_written, 0);
    assert!(marker_keys(&store).is_empty());
}

#[tokio::test]
async fn test_per_subdirectory_policy_withholds_only_incomplete() {
    let dir = local_tree(&["good/1.txt", "bad/2.txt"]);
    let store = Arc::new(InMemoryObjectStore::new());
    store.hide_after_put("bad/2.txt");

    let report = engine(&store, target(dir.path(), "", MarkerPolicy::PerSubdirectory, false))
        .run_pass()
        .await
        .unwrap();

    assert_eq!(report.markers_written, 1);
    assert_eq!(marker_keys(&store), vec!["good/syncd.txt"]);
}

#[tokio::test]
async fn test_externally_deleted_object_blocks_marker_until_reuploaded() {
    let dir = local_tree(&["sub/b.txt"]);
    let store = Arc::new(InMemoryObjectStore::new());
    let engine = engine(&store, target(dir.path(), "", MarkerPolicy::Strict, false));

    engine.run_pass().await.unwrap();
    store.remove("sub/b.txt");
    store.remove("sub/syncd.txt");

    let report = engine.run_pass().await.unwrap();
    assert_eq!(report.uploaded, 1);
    assert!(store.contains("sub/syncd.txt"));
}
