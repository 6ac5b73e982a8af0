//! bucketsync core - Domain types, ports and configuration
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `RelativePath`, `RemoteKey`, `KeyPrefix`, `Subdirectory`, `SyncTarget`
//! - **Port definitions** - The `IObjectStore` capability trait and its `StoreError`
//! - **Configuration** - The flat `key = value` loader, validation and builder
//!
//! # Architecture
//!
//! The domain module contains pure addressing rules with no I/O.
//! Ports define the trait interface that adapter crates (S3) implement.
//! The synchronization engine in `bucketsync-sync` drives the domain
//! through the port.

pub mod config;
pub mod domain;
pub mod ports;
