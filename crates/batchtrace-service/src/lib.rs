#![forbid(unsafe_code)]
//! batchtrace-service: the entry point for trace queries.
//!
//! `TraceService::trace` validates a request against `TraceConfig`, builds the
//! lineage graph, runs the mass balance over it, and returns a `TraceResult`
//! carrying a manifest with a stable fingerprint of the node and link sets.
//! The service holds no per-query state and only reads from its store.

pub mod error;
pub mod fingerprint;
pub mod metrics;
pub mod request;
pub mod result;
pub mod service;

pub use error::{Result, TraceError};
pub use request::TraceRequest;
pub use result::{BothDirections, TraceAnomaly, TraceResult, TraceStats};
pub use service::TraceService;
