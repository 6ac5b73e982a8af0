//! Sync target and policies
//!
//! A [`SyncTarget`] is the immutable description of one mirror: where the
//! local tree lives, which bucket and prefix it maps to, and the name of the
//! marker object. It is owned by the scheduler and borrowed by every pass.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{KeyPrefix, MarkerFileName, RelativePath, RemoteKey, Subdirectory};

/// How marker emission is gated on verification results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerPolicy {
    /// No marker anywhere unless every subdirectory verified complete
    #[default]
    Strict,
    /// Each subdirectory's marker depends only on its own files
    PerSubdirectory,
}

impl MarkerPolicy {
    /// Returns the configuration spelling of the policy
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::PerSubdirectory => "per_subdirectory",
        }
    }
}

impl fmt::Display for MarkerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarkerPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "per_subdirectory" | "per-subdirectory" => Ok(Self::PerSubdirectory),
            other => Err(DomainError::InvalidPolicy(format!(
                "unknown marker policy '{other}', expected 'strict' or 'per_subdirectory'"
            ))),
        }
    }
}

/// Whether remote objects without a local counterpart are removed
///
/// `DeleteOrphans` changes the safety contract: local deletions propagate
/// to the bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMode {
    /// Never delete remote objects
    #[default]
    Off,
    /// Delete remote objects under the prefix that no local file maps to
    DeleteOrphans,
}

impl ReconcileMode {
    /// Returns true if this mode may delete remote objects
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::DeleteOrphans)
    }
}

impl From<bool> for ReconcileMode {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::DeleteOrphans
        } else {
            Self::Off
        }
    }
}

/// The pair of policy switches that shape a pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPolicy {
    pub markers: MarkerPolicy,
    pub reconcile: ReconcileMode,
}

/// Immutable configuration for one mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    local_root: PathBuf,
    bucket: String,
    prefix: KeyPrefix,
    marker: MarkerFileName,
    policy: SyncPolicy,
}

impl SyncTarget {
    /// Creates a new SyncTarget with the default marker name and policy
    ///
    /// # Arguments
    ///
    /// * `local_root` - Root of the local tree to mirror
    /// * `bucket` - Remote bucket name
    /// * `prefix` - Key prefix the tree is mirrored under
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidKey` if the bucket name is empty
    pub fn new(
        local_root: impl Into<PathBuf>,
        bucket: impl Into<String>,
        prefix: KeyPrefix,
    ) -> Result<Self, DomainError> {
        let bucket = bucket.into();
        if bucket.trim().is_empty() {
            return Err(DomainError::InvalidKey("bucket name must not be empty".into()));
        }
        Ok(Self {
            local_root: local_root.into(),
            bucket,
            prefix,
            marker: MarkerFileName::default(),
            policy: SyncPolicy::default(),
        })
    }

    /// Sets the marker filename
    pub fn with_marker(mut self, marker: MarkerFileName) -> Self {
        self.marker = marker;
        self
    }

    /// Sets the marker and reconciliation policy
    pub fn with_policy(mut self, policy: SyncPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn prefix(&self) -> &KeyPrefix {
        &self.prefix
    }

    pub fn marker(&self) -> &MarkerFileName {
        &self.marker
    }

    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    /// Remote key a local file is mirrored to
    pub fn remote_key(&self, path: &RelativePath) -> RemoteKey {
        self.prefix.key_for(path)
    }

    /// Remote key of the marker object for `dir`
    ///
    /// # Errors
    ///
    /// Returns an error for [`Subdirectory::Root`]
    pub fn marker_key(&self, dir: &Subdirectory) -> Result<RemoteKey, DomainError> {
        self.prefix.marker_key(dir, &self.marker)
    }

    /// Returns true if `key` names a marker object
    pub fn is_marker_key(&self, key: &RemoteKey) -> bool {
        key.file_name() == self.marker.as_str()
    }
}
