//! Local Tree Scanner
//!
//! Walks the local root with `walkdir` and yields one [`ScannedFile`] per
//! regular file. Directory entries are not yielded, symlinks are not
//! followed, and files named like the marker object are left out since
//! the marker would overwrite them remotely.
//!
//! Any traversal error aborts the scan: a partial tree is never handed to
//! the later phases.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use bucketsync_core::domain::{
    DomainError, MarkerFileName, RelativePath, RemoteKey, Subdirectory, SyncTarget,
};

/// Errors raised while scanning the local tree
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Cannot read local root {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Local root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Traversal failed at {path}: {source}")]
    Traversal {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8(PathBuf),

    #[error("Unusable local path {path}: {source}")]
    InvalidPath {
        path: PathBuf,
        #[source]
        source: DomainError,
    },

    #[error("Scan task failed: {0}")]
    Task(String),
}

/// One regular file found under the local root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Normalized path relative to the root
    pub relative: RelativePath,
    /// Absolute (root-joined) path on the host filesystem
    pub absolute: PathBuf,
    /// Immediate parent directory
    pub parent: Subdirectory,
}

// ============================================================================
// LocalTreeScanner
// ============================================================================

/// Scanner over one local root
#[derive(Debug, Clone)]
pub struct LocalTreeScanner {
    root: PathBuf,
    marker: MarkerFileName,
}

impl LocalTreeScanner {
    /// Creates a scanner for `root` that excludes files named `marker`
    pub fn new(root: impl Into<PathBuf>, marker: MarkerFileName) -> Self {
        Self {
            root: root.into(),
            marker,
        }
    }

    /// Creates a scanner for the local side of `target`
    pub fn for_target(target: &SyncTarget) -> Self {
        Self::new(target.local_root(), target.marker().clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns a lazy iterator over the files under the root
    ///
    /// # Errors
    ///
    /// Fails immediately if the root is missing, unreadable or not a directory
    pub fn iter(&self) -> Result<ScanIter, ScanError> {
        let metadata = std::fs::metadata(&self.root).map_err(|source| ScanError::RootUnreadable {
            path: self.root.clone(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }

        let inner = WalkDir::new(&self.root)
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter();

        Ok(ScanIter {
            root: self.root.clone(),
            marker: self.marker.clone(),
            inner,
        })
    }

    /// Scans the whole tree on the current thread
    pub fn snapshot_blocking(&self) -> Result<TreeSnapshot, ScanError> {
        let files = self.iter()?.collect::<Result<Vec<_>, _>>()?;
        Ok(TreeSnapshot::from_files(files))
    }

    /// Scans the whole tree on the blocking thread pool
    pub async fn snapshot(&self) -> Result<TreeSnapshot, ScanError> {
        let scanner = self.clone();
        tokio::task::spawn_blocking(move || scanner.snapshot_blocking())
            .await
            .map_err(|e| ScanError::Task(e.to_string()))?
    }
}

/// Lazy sequence of scanned files, see [`LocalTreeScanner::iter`]
pub struct ScanIter {
    root: PathBuf,
    marker: MarkerFileName,
    inner: walkdir::IntoIter,
}

impl ScanIter {
    fn to_scanned(&self, path: &Path) -> Result<ScannedFile, ScanError> {
        let stripped = path
            .strip_prefix(&self.root)
            .map_err(|_| ScanError::InvalidPath {
                path: path.to_path_buf(),
                source: DomainError::InvalidPath("outside the local root".into()),
            })?;

        let relative = RelativePath::from_fs_path(stripped).map_err(|source| match source {
            DomainError::NonUtf8Path(_) => ScanError::NonUtf8(path.to_path_buf()),
            source => ScanError::InvalidPath {
                path: path.to_path_buf(),
                source,
            },
        })?;

        Ok(ScannedFile {
            parent: relative.parent(),
            relative,
            absolute: path.to_path_buf(),
        })
    }
}

impl Iterator for ScanIter {
    type Item = Result<ScannedFile, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(source) => {
                    let path = source
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    return Some(Err(ScanError::Traversal { path, source }));
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            if !file_type.is_file() {
                debug!(path = %entry.path().display(), "Skipping non-regular file");
                continue;
            }
            if entry.file_name() == self.marker.as_str() {
                warn!(
                    path = %entry.path().display(),
                    marker = %self.marker,
                    "Skipping local file named like the sync marker"
                );
                continue;
            }

            return Some(self.to_scanned(entry.path()));
        }
    }
}

// ============================================================================
// TreeSnapshot
// ============================================================================

/// Immutable result of one scan, shared by every phase of a pass
#[derive(Debug, Clone, Default)]
pub struct TreeSnapshot {
    files: Vec<ScannedFile>,
    subdirectories: BTreeMap<Subdirectory, BTreeSet<RelativePath>>,
}

impl TreeSnapshot {
    /// Builds a snapshot, ordering files by relative path
    pub fn from_files(files: impl IntoIterator<Item = ScannedFile>) -> Self {
        let mut files: Vec<ScannedFile> = files.into_iter().collect();
        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        files.dedup_by(|a, b| a.relative == b.relative);

        let mut subdirectories: BTreeMap<Subdirectory, BTreeSet<RelativePath>> = BTreeMap::new();
        for file in &files {
            subdirectories
                .entry(file.parent.clone())
                .or_default()
                .insert(file.relative.clone());
        }

        Self {
            files,
            subdirectories,
        }
    }

    /// All scanned files in relative-path order
    pub fn files(&self) -> &[ScannedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Every directory that directly contains at least one file, root included
    pub fn subdirectories(&self) -> &BTreeMap<Subdirectory, BTreeSet<RelativePath>> {
        &self.subdirectories
    }

    /// Directories eligible for markers, i.e. all but the root
    pub fn marker_candidates(&self) -> impl Iterator<Item = (&Subdirectory, &BTreeSet<RelativePath>)> {
        self.subdirectories.iter().filter(|(dir, _)| !dir.is_root())
    }

    /// Remote keys implied by the scan under `target`'s prefix
    pub fn remote_keys(&self, target: &SyncTarget) -> BTreeSet<RemoteKey> {
        self.files
            .iter()
            .map(|file| target.remote_key(&file.relative))
            .collect()
    }
}
