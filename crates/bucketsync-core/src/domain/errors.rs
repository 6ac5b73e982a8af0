//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! mostly validation failures of paths, prefixes and policy names.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid relative path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A local path could not be represented as UTF-8
    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8Path(String),

    /// Invalid remote key prefix
    #[error("Invalid key prefix: {0}")]
    InvalidPrefix(String),

    /// Invalid remote object key
    #[error("Invalid remote key: {0}")]
    InvalidKey(String),

    /// Invalid marker filename
    #[error("Invalid marker filename: {0}")]
    InvalidMarkerName(String),

    /// Unknown marker or reconciliation policy name
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),
}
