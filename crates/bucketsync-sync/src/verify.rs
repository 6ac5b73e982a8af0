//! Subtree Verification Engine
//!
//! After the upload phase every non-root subdirectory is re-checked against
//! the store instead of trusting the uploads, which tolerates eventual
//! consistency and concurrent external deletes. Within a subdirectory the
//! first missing file short-circuits the check.
//!
//! A missing file is a [`VerificationGap`], not an error. A failed lookup,
//! on the other hand, is a transport error and aborts the pass.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use bucketsync_core::domain::{MarkerPolicy, RelativePath, RemoteKey, Subdirectory, SyncTarget};
use bucketsync_core::ports::IObjectStore;

use crate::scanner::TreeSnapshot;
use crate::{Operation, SyncError};

/// A file expected remotely that was not found during verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationGap {
    pub subdirectory: Subdirectory,
    pub path: RelativePath,
    pub key: RemoteKey,
}

/// Per-subdirectory outcome of the verification phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    status: BTreeMap<Subdirectory, Option<VerificationGap>>,
}

impl VerificationReport {
    /// Subdirectory → fully verified
    pub fn statuses(&self) -> impl Iterator<Item = (&Subdirectory, bool)> {
        self.status.iter().map(|(dir, gap)| (dir, gap.is_none()))
    }

    pub fn is_verified(&self, dir: &Subdirectory) -> bool {
        matches!(self.status.get(dir), Some(None))
    }

    /// Number of subdirectories checked
    pub fn len(&self) -> usize {
        self.status.len()
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_empty()
    }

    pub fn verified_count(&self) -> usize {
        self.status.values().filter(|gap| gap.is_none()).count()
    }

    /// True if every checked subdirectory verified
    pub fn all_verified(&self) -> bool {
        self.status.values().all(Option::is_none)
    }

    /// The first missing file of each incomplete subdirectory
    pub fn gaps(&self) -> impl Iterator<Item = &VerificationGap> {
        self.status.values().flatten()
    }

    /// Subdirectories that receive a marker under `policy`
    ///
    /// Strict yields all or nothing; per-subdirectory yields the verified ones.
    pub fn eligible(&self, policy: MarkerPolicy) -> Vec<Subdirectory> {
        match policy {
            MarkerPolicy::Strict if !self.all_verified() => Vec::new(),
            MarkerPolicy::Strict | MarkerPolicy::PerSubdirectory => self
                .status
                .iter()
                .filter(|(_, gap)| gap.is_none())
                .map(|(dir, _)| dir.clone())
                .collect(),
        }
    }
}

/// Drives the verification phase of a pass
pub struct SubtreeVerifier<'a> {
    store: &'a dyn IObjectStore,
    target: &'a SyncTarget,
}

impl<'a> SubtreeVerifier<'a> {
    pub fn new(store: &'a dyn IObjectStore, target: &'a SyncTarget) -> Self {
        Self { store, target }
    }

    /// Re-checks every file of every non-root subdirectory
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Transport` if a lookup fails; absence is recorded
    /// as a gap instead
    pub async fn verify(&self, snapshot: &TreeSnapshot) -> Result<VerificationReport, SyncError> {
        let mut report = VerificationReport::default();

        for (dir, files) in snapshot.marker_candidates() {
            let mut gap = None;

            for path in files {
                let key = self.target.remote_key(path);
                let exists = self
                    .store
                    .exists(self.target.bucket(), &key)
                    .await
                    .map_err(|e| SyncError::transport(Operation::Exists, &key, e))?;

                if !exists {
                    warn!(subdir = %dir, path = %path, key = %key, "File missing in subdirectory");
                    gap = Some(VerificationGap {
                        subdirectory: dir.clone(),
                        path: path.clone(),
                        key,
                    });
                    break;
                }
            }

            match &gap {
                None => debug!(subdir = %dir, files = files.len(), "Subdirectory verified"),
                Some(_) => warn!(subdir = %dir, "Subdirectory is not fully synced"),
            }
            report.status.insert(dir.clone(), gap);
        }

        Ok(report)
    }
}
