//! Persisted batch records and traversal direction.
//!
//! `Batch` and `BatchRelation` are owned by the production-logging and
//! delivery-receipt workflows; the trace engine only ever reads them.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::{BatchId, RelationId, SiteId, TenantId};
use crate::units::{Amount, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchKind {
    RawMaterialLot,
    ProductionBatch,
    FinishedGood,
    Shipment,
}

/// Lifecycle status. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Active,
    Consumed,
    Disposed,
    Recalled,
}

impl BatchStatus {
    /// `active` may move anywhere, a consumed batch can still be recalled,
    /// `disposed` and `recalled` are terminal.
    pub fn can_transition_to(self, next: BatchStatus) -> bool {
        use BatchStatus::*;
        match (self, next) {
            (a, b) if a == b => true,
            (Active, _) => true,
            (Consumed, Recalled) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    /// Unique per tenant, compared case-insensitively.
    pub code: String,
    pub kind: BatchKind,
    pub quantity_produced: Amount,
    pub unit: Unit,
    /// Milliseconds since Unix epoch (UTC).
    pub produced_at: u64,
    pub site_id: SiteId,
    pub tenant_id: TenantId,
    pub status: BatchStatus,
}

impl Batch {
    /// Exact case-insensitive code match.
    pub fn code_matches(&self, code: &str) -> bool {
        normalize_code(&self.code) == normalize_code(code)
    }
}

/// Lookup key for batch codes.
pub fn normalize_code(code: &str) -> String {
    code.to_lowercase()
}

/// "`quantity_consumed` of `input_batch_id` went into `output_batch_id`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRelation {
    pub id: RelationId,
    pub input_batch_id: BatchId,
    pub output_batch_id: BatchId,
    pub quantity_consumed: Amount,
    pub unit: Unit,
    /// Milliseconds since Unix epoch (UTC).
    pub recorded_at: u64,
}

impl BatchRelation {
    pub fn is_self_loop(&self) -> bool {
        self.input_batch_id == self.output_batch_id
    }

    /// The end a traversal in `direction` arrives from.
    pub fn near_end(&self, direction: Direction) -> BatchId {
        match direction {
            Direction::Forward => self.input_batch_id,
            Direction::Backward => self.output_batch_id,
        }
    }

    /// The end a traversal in `direction` moves to.
    pub fn far_end(&self, direction: Direction) -> BatchId {
        match direction {
            Direction::Forward => self.output_batch_id,
            Direction::Backward => self.input_batch_id,
        }
    }

    /// Whether either end of the relation is in `ids`.
    pub fn touches(&self, ids: &HashSet<BatchId>) -> bool {
        ids.contains(&self.input_batch_id) || ids.contains(&self.output_batch_id)
    }
}

/// Trace direction.
///
/// `Backward` walks output→input (ancestry: what went into this batch);
/// `Forward` walks input→output (descendancy: where this batch ended up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" => Ok(Direction::Forward),
            "backward" => Ok(Direction::Backward),
            _ => Err(Error::InvalidDirection(s.to_string())),
        }
    }
}

/// Which relations to fetch for a set of batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeScope {
    /// Relations whose `output_batch_id` is in the set.
    Inbound,
    /// Relations whose `input_batch_id` is in the set.
    Outbound,
    Both,
}

impl EdgeScope {
    pub fn includes_inbound(self) -> bool {
        matches!(self, EdgeScope::Inbound | EdgeScope::Both)
    }

    pub fn includes_outbound(self) -> bool {
        matches!(self, EdgeScope::Outbound | EdgeScope::Both)
    }
}
