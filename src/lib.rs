#![forbid(unsafe_code)]
//! batchtrace: batch lineage traces and mass balance.
//!
//! Re-exports the workspace crates under one roof for integration tests,
//! benchmarks and embedding applications.

pub use batchtrace_balance;
pub use batchtrace_core;
pub use batchtrace_lineage;
pub use batchtrace_service;
pub use batchtrace_store;

pub use batchtrace_core::config::TraceConfig;
pub use batchtrace_service::{TraceRequest, TraceResult, TraceService};
pub use batchtrace_store::MemoryEdgeStore;
