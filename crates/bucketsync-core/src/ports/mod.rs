//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the sync engine depends on; implementations
//! live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IObjectStore`] - Remote blob store operations (S3 and compatibles)
//!
//! `memory::InMemoryObjectStore` is a fault-injecting implementation for
//! tests, built with the `test-util` feature.

#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod object_store;

#[cfg(any(test, feature = "test-util"))]
pub use memory::InMemoryObjectStore;
pub use object_store::{IObjectStore, ObjectBody, ObjectEntry, StoreError};
