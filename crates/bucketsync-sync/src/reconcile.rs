//! Reconciliation Policy
//!
//! Opt-in and destructive: removes remote objects under the prefix that no
//! local file maps to, so local deletions propagate to the bucket. Marker
//! objects are never candidates.

use std::collections::BTreeSet;

use tracing::info;

use bucketsync_core::domain::{RemoteKey, SyncTarget};
use bucketsync_core::ports::IObjectStore;

use crate::scanner::TreeSnapshot;
use crate::{Operation, SyncError};

/// Drives the reconciliation phase of a pass
pub struct Reconciler<'a> {
    store: &'a dyn IObjectStore,
    target: &'a SyncTarget,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn IObjectStore, target: &'a SyncTarget) -> Self {
        Self { store, target }
    }

    /// Remote keys under the prefix with no local counterpart
    pub async fn orphans(&self, snapshot: &TreeSnapshot) -> Result<Vec<RemoteKey>, SyncError> {
        let listing_prefix = self.target.prefix().listing_prefix();
        let entries = self
            .store
            .list(self.target.bucket(), &listing_prefix)
            .await
            .map_err(|e| SyncError::Transport {
                operation: Operation::List,
                key: listing_prefix.clone(),
                source: e,
            })?;

        let local: BTreeSet<RemoteKey> = snapshot.remote_keys(self.target);
        Ok(entries
            .into_iter()
            .map(|entry| entry.key)
            .filter(|key| !self.target.is_marker_key(key) && !local.contains(key))
            .collect())
    }

    /// Deletes every orphan in one batch call
    ///
    /// Returns the number of keys deleted.
    pub async fn run(&self, snapshot: &TreeSnapshot) -> Result<usize, SyncError> {
        let orphans = self.orphans(snapshot).await?;
        if orphans.is_empty() {
            return Ok(0);
        }

        for key in &orphans {
            info!(key = %key, "Deleting remote object with no local counterpart");
        }

        self.store
            .delete_batch(self.target.bucket(), &orphans)
            .await
            .map_err(|e| SyncError::Transport {
                operation: Operation::DeleteBatch,
                key: format!("{} key(s)", orphans.len()),
                source: e,
            })?;

        Ok(orphans.len())
    }
}
