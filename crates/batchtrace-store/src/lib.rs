#![forbid(unsafe_code)]
//! batchtrace-store: read-side access to persisted batches and relations.
//!
//! The trace engine talks to storage only through [`EdgeStore`], whose
//! relation lookup takes a whole traversal frontier at once (an IN-list), so
//! a trace costs one round trip per depth level instead of one per node.
//!
//! - `memory`: tenant-partitioned in-memory store (tests, CLI snapshots).
//! - `snapshot`: JSONL snapshot reader/writer feeding the memory store.
//! - `audit`: write-side invariant checks over a snapshot.

pub mod audit;
pub mod error;
pub mod memory;
pub mod snapshot;
pub mod store;

pub use audit::{audit_records, Violation};
pub use error::{Result, StoreError};
pub use memory::MemoryEdgeStore;
pub use snapshot::{read_snapshot, read_snapshot_path, JsonlSnapshotWriter, SnapshotRecord};
pub use store::EdgeStore;
