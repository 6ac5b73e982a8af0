//! End-to-end pass scenarios for bucketsync-sync
//!
//! Builds real local trees with tempfile and runs full passes against the
//! in-memory object store.

mod common;

mod test_idempotence;
mod test_markers;
mod test_reconcile;
mod test_scan_failures;
mod test_scheduler;
