//! Upload Decision Engine
//!
//! Existence alone is authoritative: a file is uploaded iff its remote key
//! is absent. Content and modification time are never compared, so an
//! object that exists remotely is never replaced by a later pass.
//!
//! The first failed lookup or upload aborts the phase. Files uploaded
//! before the failure stay uploaded.

use tracing::{debug, error, info};

use bucketsync_core::domain::SyncTarget;
use bucketsync_core::ports::{IObjectStore, ObjectBody};

use crate::scanner::{ScannedFile, TreeSnapshot};
use crate::{Operation, SyncError};

/// Outcome for a single scanned file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadDecision {
    /// Absent remotely and uploaded during this pass
    Uploaded,
    /// Already present remotely
    Skipped,
}

/// Counters for the upload phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadStats {
    pub uploaded: usize,
    pub skipped: usize,
}

/// Drives the upload phase of a pass
pub struct Uploader<'a> {
    store: &'a dyn IObjectStore,
    target: &'a SyncTarget,
}

impl<'a> Uploader<'a> {
    pub fn new(store: &'a dyn IObjectStore, target: &'a SyncTarget) -> Self {
        Self { store, target }
    }

    /// Uploads every file of `snapshot` that is absent remotely, in order
    ///
    /// # Errors
    ///
    /// Returns the first `SyncError::Transport` raised; remaining files are
    /// not attempted
    pub async fn run(&self, snapshot: &TreeSnapshot) -> Result<UploadStats, SyncError> {
        let mut stats = UploadStats::default();

        for file in snapshot.files() {
            match self.process(file).await? {
                UploadDecision::Uploaded => stats.uploaded += 1,
                UploadDecision::Skipped => stats.skipped += 1,
            }
        }

        Ok(stats)
    }

    /// Checks one file and uploads it if needed
    pub async fn process(&self, file: &ScannedFile) -> Result<UploadDecision, SyncError> {
        let bucket = self.target.bucket();
        let key = self.target.remote_key(&file.relative);

        let exists = self
            .store
            .exists(bucket, &key)
            .await
            .map_err(|e| SyncError::transport(Operation::Exists, &key, e))?;

        if exists {
            debug!(path = %file.relative, key = %key, "Already present remotely, skipping");
            return Ok(UploadDecision::Skipped);
        }

        if let Err(e) = self
            .store
            .put(bucket, &key, ObjectBody::File(file.absolute.clone()))
            .await
        {
            error!(path = %file.relative, key = %key, error = %e, "Upload failed");
            return Err(SyncError::transport(Operation::Put, &key, e));
        }

        info!(
            path = %file.absolute.display(),
            destination = %format_args!("s3://{bucket}/{key}"),
            "Uploaded new file"
        );
        Ok(UploadDecision::Uploaded)
    }
}
