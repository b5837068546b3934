#![forbid(unsafe_code)]
//! batchtrace-core: shared vocabulary for the trace engine.
//!
//! Strongly-typed ids, the persisted `Batch`/`BatchRelation` records, exact
//! fixed-point quantities with a closed unit table, configuration, and the
//! per-trace manifest. Pure data: no I/O and no async here.

pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod manifest;
pub mod model;
pub mod units;

/// Engine version recorded in every trace manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
