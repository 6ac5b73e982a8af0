//! Scan failures abort the pass before any remote call

use std::sync::Arc;

use bucketsync_core::domain::MarkerPolicy;
use bucketsync_core::ports::InMemoryObjectStore;
use bucketsync_sync::{ScanError, SyncError};

use crate::common::{engine, local_tree, target};

#[cfg(unix)]
#[tokio::test]
async fn test_non_utf8_name_mid_walk_aborts_whole_pass() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    // sorted walk visits a.txt and sub/b.txt before the bad name
    let dir = local_tree(&["a.txt", "sub/b.txt"]);
    let bad = dir.path().join("sub").join(OsStr::from_bytes(b"zz\xff.txt"));
    std::fs::write(&bad, b"bad").unwrap();

    let store = Arc::new(InMemoryObjectStore::new());
    let err = engine(&store, target(dir.path(), "", MarkerPolicy::Strict, true))
        .run_pass()
        .await
        .unwrap_err();

    assert!(err.is_scan(), "got {err:?}");
    assert!(matches!(err, SyncError::Scan(ScanError::NonUtf8(_))));
    assert_eq!(store.put_count(), 0);
    assert_eq!(store.exists_count(), 0);
    assert_eq!(store.calls().list.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert!(store.keys().is_empty());
}

#[tokio::test]
async fn test_missing_root_makes_no_remote_calls() {
    let dir = local_tree(&[]);
    let root = dir.path().join("not-there");

    let store = Arc::new(InMemoryObjectStore::new());
    let err = engine(&store, target(&root, "", MarkerPolicy::Strict, false))
        .run_pass()
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Scan(ScanError::RootUnreadable { .. })));
    assert_eq!(store.exists_count(), 0);
}
