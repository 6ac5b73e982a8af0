//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for the addressing scheme
//! of a sync target. Each newtype ensures data validity at construction time.
//!
//! ## Addressing
//!
//! ```text
//! RelativePath  "sub/b.txt"
//! KeyPrefix     "backups"            (may be empty)
//! RemoteKey     "backups/sub/b.txt"  (or "sub/b.txt" with an empty prefix)
//! ```

use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// PassId
// ============================================================================

/// Identifier for a single synchronization pass, used to correlate log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PassId(Uuid);

impl PassId {
    /// Create a new random PassId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PassId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PassId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PassId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidKey(format!("Invalid PassId: {e}")))
    }
}

// ============================================================================
// RelativePath
// ============================================================================

/// A normalized, forward-slash separated path relative to the local root
///
/// Never empty, never starts or ends with `/`, and contains no empty,
/// `.` or `..` segments. Unique within one scan.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath(String);

impl RelativePath {
    /// Create a RelativePath from an already forward-slash separated string
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPath` if the path is empty, absolute,
    /// or contains empty, `.` or `..` segments
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let path = path.into();

        if path.is_empty() {
            return Err(DomainError::InvalidPath(
                "relative path must not be empty".to_string(),
            ));
        }
        if path.starts_with('/') {
            return Err(DomainError::InvalidPath(format!(
                "relative path must not be absolute: {path}"
            )));
        }
        for segment in path.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(DomainError::InvalidPath(format!(
                    "invalid segment {segment:?} in {path}"
                )));
            }
        }

        Ok(Self(path))
    }

    /// Create a RelativePath from a host filesystem path relative to the root
    ///
    /// Components are joined with `/` regardless of the host separator, so
    /// remote keys derived from the result are platform-independent.
    ///
    /// # Errors
    /// Returns an error if the path has non-relative components or is not UTF-8
    pub fn from_fs_path(path: &Path) -> Result<Self, DomainError> {
        let mut segments = Vec::new();

        for component in path.components() {
            match component {
                Component::Normal(c) => {
                    let segment = c
                        .to_str()
                        .ok_or_else(|| DomainError::NonUtf8Path(path.display().to_string()))?;
                    segments.push(segment);
                }
                Component::CurDir => {}
                _ => {
                    return Err(DomainError::InvalidPath(format!(
                        "not a relative path: {}",
                        path.display()
                    )))
                }
            }
        }

        Self::new(segments.join("/"))
    }

    /// Get the path as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The final segment of the path
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The immediate parent directory, [`Subdirectory::Root`] for top-level files
    #[must_use]
    pub fn parent(&self) -> Subdirectory {
        match self.0.rsplit_once('/') {
            Some((dir, _)) => Subdirectory::Path(Self(dir.to_string())),
            None => Subdirectory::Root,
        }
    }

    /// Append a single segment to this path
    ///
    /// # Errors
    /// Returns error if the segment contains `/` or is otherwise invalid
    pub fn join(&self, segment: &str) -> Result<Self, DomainError> {
        if segment.contains('/') {
            return Err(DomainError::InvalidPath(format!(
                "invalid path component: {segment}"
            )));
        }
        Self::new(format!("{}/{}", self.0, segment))
    }
}

impl Display for RelativePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RelativePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RelativePath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RelativePath> for String {
    fn from(path: RelativePath) -> Self {
        path.0
    }
}

// ============================================================================
// Subdirectory
// ============================================================================

/// The directory that immediately contains a scanned file
///
/// The root directory is displayed as `.` and is never eligible for a marker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Subdirectory {
    /// The local root itself
    Root,
    /// A directory below the root
    Path(RelativePath),
}

impl Subdirectory {
    /// Returns true for the local root
    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }

    /// The directory path, `None` for the root
    #[must_use]
    pub fn as_path(&self) -> Option<&RelativePath> {
        match self {
            Self::Root => None,
            Self::Path(path) => Some(path),
        }
    }
}

impl Display for Subdirectory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "."),
            Self::Path(path) => write!(f, "{path}"),
        }
    }
}

impl TryFrom<String> for Subdirectory {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s == "." {
            Ok(Self::Root)
        } else {
            RelativePath::new(s).map(Self::Path)
        }
    }
}

impl From<Subdirectory> for String {
    fn from(dir: Subdirectory) -> Self {
        dir.to_string()
    }
}

// ============================================================================
// MarkerFileName
// ============================================================================

/// Default name of the per-subdirectory completion marker
pub const DEFAULT_MARKER_FILE: &str = "syncd.txt";

/// Filename of the completion marker written into each verified subdirectory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MarkerFileName(String);

impl MarkerFileName {
    /// Create a new MarkerFileName
    ///
    /// # Errors
    /// Returns error if the name is empty, `.`/`..`, or contains a separator
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.is_empty() || name == "." || name == ".." {
            return Err(DomainError::InvalidMarkerName(name));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(DomainError::InvalidMarkerName(name));
        }
        Ok(Self(name))
    }

    /// Get the name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MarkerFileName {
    fn default() -> Self {
        Self(DEFAULT_MARKER_FILE.to_string())
    }
}

impl Display for MarkerFileName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for MarkerFileName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<MarkerFileName> for String {
    fn from(name: MarkerFileName) -> Self {
        name.0
    }
}

// ============================================================================
// RemoteKey
// ============================================================================

/// The key of an object in the remote store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteKey(String);

impl RemoteKey {
    /// Create a RemoteKey from a raw key string (e.g. from a listing)
    ///
    /// # Errors
    /// Returns `DomainError::InvalidKey` if the key is empty
    pub fn new(key: impl Into<String>) -> Result<Self, DomainError> {
        let key = key.into();
        if key.is_empty() {
            return Err(DomainError::InvalidKey("remote key must not be empty".into()));
        }
        Ok(Self(key))
    }

    /// Get the key as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The final `/`-separated segment of the key
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl Display for RemoteKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RemoteKey {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteKey> for String {
    fn from(key: RemoteKey) -> Self {
        key.0
    }
}

// ============================================================================
// KeyPrefix
// ============================================================================

/// Key prefix under which the local tree is mirrored
///
/// Leading and trailing slashes are trimmed on construction; an empty
/// prefix mirrors into the bucket root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyPrefix(String);

impl KeyPrefix {
    /// Create a new KeyPrefix
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPrefix` for empty, `.` or `..` inner segments
    pub fn new(prefix: impl AsRef<str>) -> Result<Self, DomainError> {
        let trimmed = prefix.as_ref().trim().trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        for segment in trimmed.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(DomainError::InvalidPrefix(prefix.as_ref().to_string()));
            }
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns true if objects are mirrored into the bucket root
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the prefix as a string slice (without trailing slash)
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Remote key for a scanned file: `prefix + "/" + path`
    #[must_use]
    pub fn key_for(&self, path: &RelativePath) -> RemoteKey {
        if self.is_empty() {
            RemoteKey(path.as_str().to_string())
        } else {
            RemoteKey(format!("{}/{}", self.0, path))
        }
    }

    /// Remote key of the marker object for a subdirectory
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPath` for the root, which never carries a marker
    pub fn marker_key(
        &self,
        dir: &Subdirectory,
        marker: &MarkerFileName,
    ) -> Result<RemoteKey, DomainError> {
        let dir = dir.as_path().ok_or_else(|| {
            DomainError::InvalidPath("the root directory never carries a marker".into())
        })?;
        Ok(self.key_for(&dir.join(marker.as_str())?))
    }

    /// Prefix passed to listing calls, with a trailing slash when non-empty
    ///
    /// The slash keeps sibling prefixes (`data` vs `data2`) out of the listing.
    #[must_use]
    pub fn listing_prefix(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!("{}/", self.0)
        }
    }
}

impl Display for KeyPrefix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for KeyPrefix {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for KeyPrefix {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<KeyPrefix> for String {
    fn from(prefix: KeyPrefix) -> Self {
        prefix.0
    }
}

// ============================================================================
// Tests
// ============================================================================
