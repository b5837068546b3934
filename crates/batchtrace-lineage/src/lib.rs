#![forbid(unsafe_code)]
//! batchtrace-lineage: lineage graph builder (batches → node/link sets).
//!
//! Responsibilities:
//! - Resolve the root batch within its tenant.
//! - Walk consumption edges breadth-first, forward or backward, one batched
//!   store round trip per depth level.
//! - Stop a branch that re-enters its own path and flag it instead of
//!   recursing (the relation set is *supposed* to be a DAG).
//! - Honour depth and node ceilings and say so when they cut the walk short.
//!
//! Read-only: nothing here writes to the store.

pub mod builder;
pub mod error;
pub mod frontier;
pub mod graph;
pub mod interrupt;
pub mod verify;

pub use builder::{BuildLimits, LineageGraphBuilder};
pub use error::{LineageError, Result};
pub use frontier::{TraversalStats, TraversalStep};
pub use graph::{CycleFlag, GraphAnomaly, LineageGraph, TraceLink, TraceNode, TruncationReason};
pub use interrupt::{CancelToken, Interrupt};
