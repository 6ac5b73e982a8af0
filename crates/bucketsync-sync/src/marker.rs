//! Marker Publisher
//!
//! Writes `<prefix>/<subdir>/<marker>` for each eligible subdirectory. The
//! body is informational only and never read back:
//!
//! ```text
//! Synced at: 2024-05-01T12:00:00+00:00
//! All subdirectories verified complete.
//! ```
//!
//! Markers are overwritten on every successful pass. The write is not
//! atomic with the verification that gated it.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{error, info};

use bucketsync_core::domain::{MarkerPolicy, Subdirectory, SyncTarget};
use bucketsync_core::ports::{IObjectStore, ObjectBody};

use crate::{Operation, SyncError};

/// Renders the marker body for a pass finished at `at`
pub fn marker_body(at: DateTime<Utc>, policy: MarkerPolicy) -> String {
    let note = match policy {
        MarkerPolicy::Strict => "All subdirectories verified complete.",
        MarkerPolicy::PerSubdirectory => "Subdirectory verified complete.",
    };
    format!(
        "Synced at: {}\n{note}\n",
        at.to_rfc3339_opts(SecondsFormat::Secs, false)
    )
}

/// Drives the marker phase of a pass
pub struct MarkerPublisher<'a> {
    store: &'a dyn IObjectStore,
    target: &'a SyncTarget,
}

impl<'a> MarkerPublisher<'a> {
    pub fn new(store: &'a dyn IObjectStore, target: &'a SyncTarget) -> Self {
        Self { store, target }
    }

    /// Writes one marker per directory in `dirs`, stopping at the first failure
    ///
    /// Returns the number of markers written.
    pub async fn publish(&self, dirs: &[Subdirectory], at: DateTime<Utc>) -> Result<usize, SyncError> {
        let body = marker_body(at, self.target.policy().markers);
        let mut written = 0;

        for dir in dirs {
            let key = self.target.marker_key(dir)?;

            if let Err(e) = self
                .store
                .put(self.target.bucket(), &key, ObjectBody::text(body.clone()))
                .await
            {
                error!(subdir = %dir, key = %key, error = %e, "Failed to write sync marker");
                return Err(SyncError::transport(Operation::PutMarker, &key, e));
            }

            info!(subdir = %dir, key = %key, "Created sync marker");
            written += 1;
        }

        Ok(written)
    }
}
