//! Synchronization pass
//!
//! The [`SyncEngine`] runs one full pass over a [`SyncTarget`]:
//!
//! 1. **Scan**: build an immutable [`TreeSnapshot`] of the local root
//! 2. **Upload**: put every file whose key is absent remotely
//! 3. **Verify**: re-check every non-root subdirectory
//! 4. **Mark**: write markers for the subdirectories the policy allows
//! 5. **Reconcile** (opt-in): delete remote orphans under the prefix
//!
//! Scan errors and transport errors abort the pass. Missing files found
//! during verification only withhold markers and are itemised in the
//! returned [`PassReport`].
//!
//! Files are processed one at a time; a pass never issues concurrent
//! remote calls.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use bucketsync_core::domain::{MarkerPolicy, PassId, ReconcileMode, SyncTarget};
use bucketsync_core::ports::IObjectStore;

use crate::marker::MarkerPublisher;
use crate::reconcile::Reconciler;
use crate::scanner::{LocalTreeScanner, TreeSnapshot};
use crate::upload::Uploader;
use crate::verify::{SubtreeVerifier, VerificationGap};
use crate::SyncError;

// ============================================================================
// PassReport
// ============================================================================

/// Summary of a completed pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    pub pass_id: PassId,
    pub started_at: DateTime<Utc>,
    /// Files uploaded because their key was absent
    pub uploaded: usize,
    /// Files already present remotely
    pub skipped: usize,
    /// Non-root subdirectories checked during verification
    pub subdirectories_checked: usize,
    /// Subdirectories whose every file was confirmed present
    pub subdirectories_verified: usize,
    /// First missing file of each incomplete subdirectory
    pub gaps: Vec<VerificationGap>,
    pub markers_written: usize,
    /// Remote orphans deleted by reconciliation
    pub deleted: usize,
    pub marker_policy: MarkerPolicy,
    pub reconcile: ReconcileMode,
    pub duration_ms: u64,
}

impl PassReport {
    /// Creates an empty report for a pass starting now
    pub fn new(pass_id: PassId, marker_policy: MarkerPolicy, reconcile: ReconcileMode) -> Self {
        Self {
            pass_id,
            started_at: Utc::now(),
            uploaded: 0,
            skipped: 0,
            subdirectories_checked: 0,
            subdirectories_verified: 0,
            gaps: Vec::new(),
            markers_written: 0,
            deleted: 0,
            marker_policy,
            reconcile,
            duration_ms: 0,
        }
    }

    /// True when verification found no missing file
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty()
    }
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Runs passes of one sync target against one object store
#[derive(Clone)]
pub struct SyncEngine {
    store: Arc<dyn IObjectStore>,
    target: Arc<SyncTarget>,
}

impl SyncEngine {
    /// Creates a new engine
    ///
    /// # Arguments
    ///
    /// * `store` - Object store the target's bucket lives in
    /// * `target` - What to mirror and where
    pub fn new(store: Arc<dyn IObjectStore>, target: Arc<SyncTarget>) -> Self {
        Self { store, target }
    }

    pub fn target(&self) -> &SyncTarget {
        &self.target
    }

    /// Runs one pass with a fresh [`PassId`]
    pub async fn run_pass(&self) -> Result<PassReport, SyncError> {
        self.run_pass_with_id(PassId::new()).await
    }

    /// Runs one pass, logging its outcome
    #[tracing::instrument(
        name = "pass",
        skip_all,
        fields(pass_id = %pass_id, bucket = %self.target.bucket(), prefix = %self.target.prefix())
    )]
    pub async fn run_pass_with_id(&self, pass_id: PassId) -> Result<PassReport, SyncError> {
        let start = Instant::now();
        info!(
            root = %self.target.local_root().display(),
            policy = %self.target.policy().markers,
            reconcile = self.target.policy().reconcile.is_destructive(),
            "Starting full directory sync"
        );

        let mut report = PassReport::new(
            pass_id,
            self.target.policy().markers,
            self.target.policy().reconcile,
        );

        match self.execute(&mut report).await {
            Ok(()) => {
                report.duration_ms = start.elapsed().as_millis() as u64;
                let summary = serde_json::to_string(&report).unwrap_or_default();
                if report.is_complete() {
                    info!(report = %summary, "Full sync completed successfully");
                } else {
                    warn!(
                        gaps = report.gaps.len(),
                        report = %summary,
                        "Full sync completed with incomplete subdirectories"
                    );
                }
                Ok(report)
            }
            Err(e) => {
                error!(
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Full sync failed"
                );
                Err(e)
            }
        }
    }

    async fn execute(&self, report: &mut PassReport) -> Result<(), SyncError> {
        let store = self.store.as_ref();
        let target = self.target.as_ref();

        let snapshot: TreeSnapshot = LocalTreeScanner::for_target(target).snapshot().await?;
        info!(files = snapshot.len(), "Scanned local tree");

        let uploads = Uploader::new(store, target).run(&snapshot).await?;
        report.uploaded = uploads.uploaded;
        report.skipped = uploads.skipped;

        let verification = SubtreeVerifier::new(store, target).verify(&snapshot).await?;
        report.subdirectories_checked = verification.len();
        report.subdirectories_verified = verification.verified_count();
        report.gaps = verification.gaps().cloned().collect();

        let eligible = verification.eligible(report.marker_policy);
        match report.marker_policy {
            MarkerPolicy::Strict if !verification.all_verified() => {
                warn!("Some subdirectories are not fully synced, skipping all marker files");
                for gap in &report.gaps {
                    warn!(subdir = %gap.subdirectory, missing = %gap.key, "Incomplete sync");
                }
            }
            MarkerPolicy::Strict if !eligible.is_empty() => {
                info!("All subdirectories are fully synced, creating marker files");
            }
            _ => {
                for gap in &report.gaps {
                    warn!(subdir = %gap.subdirectory, missing = %gap.key, "Withholding marker");
                }
            }
        }

        report.markers_written = MarkerPublisher::new(store, target)
            .publish(&eligible, Utc::now())
            .await?;

        if report.reconcile.is_destructive() {
            report.deleted = Reconciler::new(store, target).run(&snapshot).await?;
        }

        Ok(())
    }
}
