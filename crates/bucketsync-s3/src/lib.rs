//! bucketsync S3 - Amazon S3 object store adapter
//!
//! Implements the [`IObjectStore`](bucketsync_core::ports::IObjectStore)
//! port over `aws-sdk-s3`, for AWS itself and for S3-compatible stores
//! (MinIO, R2, ...) reached through a custom endpoint.
//!
//! ## Modules
//!
//! - [`client`] - SDK client construction from [`StoreConfig`](bucketsync_core::config::StoreConfig)
//! - [`errors`] - Mapping of SDK failures onto `StoreError`
//! - [`provider`] - The `IObjectStore` implementation

pub mod client;
pub mod errors;
pub mod provider;

pub use client::build_client;
pub use provider::S3ObjectStore;
