//! The assembled answer to one trace query.

use serde::{Deserialize, Serialize};

use batchtrace_balance::{BalanceOutcome, MassBalanceReport};
use batchtrace_core::id::{BatchId, RelationId};
use batchtrace_core::manifest::TraceManifest;
use batchtrace_core::model::{Batch, Direction};
use batchtrace_core::units::Unit;
use batchtrace_lineage::{CycleFlag, GraphAnomaly, TraceLink, TraceNode, TruncationReason};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceResult {
    pub direction: Direction,
    /// The root batch.
    pub batch: Batch,
    pub nodes: Vec<TraceNode>,
    pub links: Vec<TraceLink>,
    pub mass_balance: MassBalanceReport,
    pub truncated: bool,
    pub truncation: Option<TruncationReason>,
    pub cycle_flags: Vec<CycleFlag>,
    pub anomalies: Vec<TraceAnomaly>,
    pub stats: TraceStats,
    pub manifest: TraceManifest,
}

impl TraceResult {
    pub fn node_by_code(&self, code: &str) -> Option<&TraceNode> {
        self.nodes.iter().find(|n| n.batch.code_matches(code))
    }
}

/// Forward and backward traces of the same root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BothDirections {
    pub forward: TraceResult,
    pub backward: TraceResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStats {
    pub levels_expanded: u32,
    pub round_trips: u32,
    pub max_frontier_size: usize,
    pub nodes: usize,
    pub links: usize,
    pub elapsed_ms: u64,
}

/// Soft problems found while tracing. None of them fail the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "anomaly", rename_all = "snake_case")]
pub enum TraceAnomaly {
    DanglingRelation {
        relation_id: RelationId,
        missing_batch: BatchId,
    },
    ForeignTenantRecord {
        batch: BatchId,
    },
    NonPositiveQuantity {
        relation_id: RelationId,
    },
    UnitMismatch {
        batch: BatchId,
        expected: Unit,
        found: Unit,
        relation_id: RelationId,
    },
    BalanceOverflow {
        batch: BatchId,
    },
}

impl From<GraphAnomaly> for TraceAnomaly {
    fn from(a: GraphAnomaly) -> Self {
        match a {
            GraphAnomaly::DanglingRelation {
                relation_id,
                missing_batch,
            } => TraceAnomaly::DanglingRelation {
                relation_id,
                missing_batch,
            },
            GraphAnomaly::ForeignTenantRecord { batch } => TraceAnomaly::ForeignTenantRecord { batch },
            GraphAnomaly::NonPositiveQuantity { relation_id } => {
                TraceAnomaly::NonPositiveQuantity { relation_id }
            }
        }
    }
}

/// Balance failures surfaced next to the graph anomalies.
pub(crate) fn balance_anomalies(report: &MassBalanceReport) -> impl Iterator<Item = TraceAnomaly> + '_ {
    report.per_node.iter().filter_map(|n| match &n.outcome {
        BalanceOutcome::Computed { .. } => None,
        BalanceOutcome::UnitMismatch {
            expected,
            found,
            relation_id,
        } => Some(TraceAnomaly::UnitMismatch {
            batch: n.batch_id,
            expected: expected.clone(),
            found: found.clone(),
            relation_id: *relation_id,
        }),
        BalanceOutcome::Overflow => Some(TraceAnomaly::BalanceOverflow { batch: n.batch_id }),
    })
}
