//! Shared helpers for pass scenarios

use std::fs;
use std::path::Path;
use std::sync::Arc;

use bucketsync_core::domain::{KeyPrefix, MarkerPolicy, ReconcileMode, SyncPolicy, SyncTarget};
use bucketsync_core::ports::InMemoryObjectStore;
use bucketsync_sync::SyncEngine;

/// Creates a temporary local tree containing `files` (content = path)
pub fn local_tree(files: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for rel in files {
        write_file(dir.path(), rel);
    }
    dir
}

pub fn write_file(root: &Path, rel: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(&path, rel.as_bytes()).expect("write");
}

pub fn target(root: &Path, prefix: &str, markers: MarkerPolicy, reconcile: bool) -> SyncTarget {
    SyncTarget::new(root, "test-bucket", KeyPrefix::new(prefix).expect("prefix"))
        .expect("target")
        .with_policy(SyncPolicy {
            markers,
            reconcile: ReconcileMode::from(reconcile),
        })
}

pub fn engine(store: &Arc<InMemoryObjectStore>, target: SyncTarget) -> SyncEngine {
    SyncEngine::new(store.clone(), Arc::new(target))
}

/// Keys in the store that name a marker object
pub fn marker_keys(store: &InMemoryObjectStore) -> Vec<String> {
    store
        .keys()
        .into_iter()
        .filter(|k| k.ends_with("syncd.txt"))
        .collect()
}
