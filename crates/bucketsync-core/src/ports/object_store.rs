//! Object store port (driven/secondary port)
//!
//! This module defines the capability interface the sync engine consumes
//! for talking to a remote key/blob store. The primary implementation is
//! the S3 adapter in `bucketsync-s3`; the in-memory store in
//! `memory` (feature `test-util`) backs tests.
//!
//! ## Design Notes
//!
//! - "Not found" is never an error: `exists` answers `Ok(false)`. Every
//!   `Err` means the lookup itself failed and must not be read as absence.
//! - Errors are classified so the retry decorator can tell transient
//!   failures from permanent ones.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::newtypes::RemoteKey;

// ============================================================================
// StoreError
// ============================================================================

/// Failure of a single remote operation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Credentials were rejected or lack permission (HTTP 401/403)
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The store asked us to slow down (HTTP 429/503, `SlowDown`)
    #[error("Throttled by store: {0}")]
    Throttled(String),

    /// The operation did not complete within its deadline
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Network, protocol or unclassified service failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The local body could not be read while streaming it
    #[error("Failed to read upload body: {0}")]
    Body(String),

    /// A batch delete removed some keys but reported failures for others
    #[error("Batch delete failed for {} key(s): {}", failed.len(), failed.join(", "))]
    PartialDelete {
        /// Keys the store reported as not deleted
        failed: Vec<String>,
    },
}

impl StoreError {
    /// Returns true if repeating the operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Throttled(_) | Self::Timeout(_) | Self::Transport(_)
        )
    }
}

// ============================================================================
// ObjectBody / ObjectEntry
// ============================================================================

/// Content supplied to [`IObjectStore::put`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectBody {
    /// Stream the contents of a local file
    File(PathBuf),
    /// Small in-memory payload, used for marker objects
    Bytes {
        data: Vec<u8>,
        content_type: String,
    },
}

impl ObjectBody {
    /// Creates a `text/plain` in-memory body
    pub fn text(body: impl Into<String>) -> Self {
        Self::Bytes {
            data: body.into().into_bytes(),
            content_type: "text/plain".to_string(),
        }
    }
}

/// One object returned by [`IObjectStore::list`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Full key of the object
    pub key: RemoteKey,
    /// Object size in bytes
    pub size: u64,
    /// Last modification time reported by the store
    pub last_modified: Option<DateTime<Utc>>,
}

// ============================================================================
// IObjectStore trait
// ============================================================================

/// Port trait for remote object store operations
///
/// All calls are issued sequentially by a single pass; implementations only
/// need to be `Send + Sync` so the store can be shared across passes.
#[async_trait::async_trait]
pub trait IObjectStore: Send + Sync {
    /// Metadata-only existence check
    ///
    /// # Arguments
    /// * `bucket` - Bucket to query
    /// * `key` - Key to look up
    ///
    /// # Returns
    /// `Ok(true)` if an object is addressable at `key`, `Ok(false)` if the
    /// store confirmed it absent
    async fn exists(&self, bucket: &str, key: &RemoteKey) -> Result<bool, StoreError>;

    /// Stores `body` under `key`, overwriting any existing object
    async fn put(&self, bucket: &str, key: &RemoteKey, body: ObjectBody) -> Result<(), StoreError>;

    /// Lists every object whose key starts with `prefix`
    ///
    /// Pagination is handled by the implementation.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError>;

    /// Deletes the given keys
    ///
    /// Implementations split large batches to fit store limits. Missing keys
    /// are not an error.
    async fn delete_batch(&self, bucket: &str, keys: &[RemoteKey]) -> Result<(), StoreError>;
}
