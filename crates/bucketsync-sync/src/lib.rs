//! bucketsync sync - Presence-based mirror engine
//!
//! Provides:
//! - Local tree scanning into an immutable per-pass snapshot
//! - Existence-only upload decisions (no hashing, no mtime comparison)
//! - Subtree verification gating completion markers
//! - Optional orphan reconciliation
//! - A single-flight periodic scheduler
//!
//! ## Modules
//!
//! - [`scanner`] - Local Tree Scanner and [`scanner::TreeSnapshot`]
//! - [`upload`] - Upload Decision Engine
//! - [`verify`] - Subtree Verification Engine
//! - [`marker`] - Marker Publisher
//! - [`reconcile`] - Reconciliation Policy
//! - [`engine`] - One full pass over the phases above
//! - [`retry`] - Deadline and retry decorator over any object store
//! - [`scheduler`] - Initial pass plus interval ticks, never overlapping

pub mod engine;
pub mod marker;
pub mod reconcile;
pub mod retry;
pub mod scanner;
pub mod scheduler;
pub mod upload;
pub mod verify;

use thiserror::Error;

use bucketsync_core::domain::{DomainError, RemoteKey};
use bucketsync_core::ports::StoreError;

pub use engine::{PassReport, SyncEngine};
pub use retry::{RetryPolicy, RetryingStore};
pub use scanner::{LocalTreeScanner, ScanError, TreeSnapshot};
pub use scheduler::{PassRunner, SchedulerState, SchedulerSummary, SyncScheduler};
pub use verify::VerificationGap;

/// Remote operation named in a [`SyncError::Transport`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Exists,
    Put,
    PutMarker,
    List,
    DeleteBatch,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Exists => "exists",
            Self::Put => "put",
            Self::PutMarker => "put marker",
            Self::List => "list",
            Self::DeleteBatch => "delete batch",
        })
    }
}

/// Errors that abort a synchronization pass
#[derive(Debug, Error)]
pub enum SyncError {
    /// The local tree could not be scanned
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),

    /// A remote call failed
    #[error("{operation} failed for '{key}': {source}")]
    Transport {
        operation: Operation,
        key: String,
        #[source]
        source: StoreError,
    },

    /// A domain-level error propagated from bucketsync-core
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// The task running the pass panicked or was aborted
    #[error("Pass task failed: {0}")]
    Task(String),
}

impl SyncError {
    pub(crate) fn transport(operation: Operation, key: &RemoteKey, source: StoreError) -> Self {
        Self::Transport {
            operation,
            key: key.to_string(),
            source,
        }
    }

    /// Returns true for local scan failures
    pub fn is_scan(&self) -> bool {
        matches!(self, Self::Scan(_))
    }
}
