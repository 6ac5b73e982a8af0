//! Domain entities and addressing rules
//!
//! This module contains the core domain types for bucketsync:
//! - Newtypes for validated paths, prefixes and remote keys
//! - The immutable sync target and its policies
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;
pub mod target;

// Re-export commonly used types
pub use errors::DomainError;
pub use newtypes::*;
pub use target::{MarkerPolicy, ReconcileMode, SyncPolicy, SyncTarget};
