#![forbid(unsafe_code)]
//! batchtrace-balance: mass balance over a built lineage graph.
//!
//! Design intent:
//! - Pure and synchronous; no store access, no I/O.
//! - Quantities are normalized to the base unit of their dimension before
//!   summing. A node whose lines mix dimensions fails on its own with a unit
//!   mismatch; every other node still computes.
//! - No built-in variance threshold. Callers may pass a [`VarianceTolerance`].

pub mod calculator;
pub mod record;
pub mod tolerance;

pub use calculator::{BalanceOutcome, MassBalanceCalculator, MassBalanceReport, NodeMassBalance};
pub use record::MassBalanceRecord;
pub use tolerance::{ToleranceVerdict, VarianceTolerance};
