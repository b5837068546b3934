//! Derived, per-query trace graph. Never persisted.

use serde::{Deserialize, Serialize};

use batchtrace_core::id::{BatchId, RelationId};
use batchtrace_core::model::{Batch, BatchRelation, Direction};
use batchtrace_core::units::{Amount, Quantity, Unit};

use crate::frontier::TraversalStats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceNode {
    pub batch: Batch,
    /// Hops from the root along the shortest discovered path.
    pub depth: u32,
    /// Set when an edge out of this node re-entered its own path.
    pub cycle_guard_triggered: bool,
}

/// One consumption edge, always oriented input → output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceLink {
    pub relation_id: RelationId,
    pub from_node: BatchId,
    pub to_node: BatchId,
    pub quantity: Amount,
    pub unit: Unit,
    pub recorded_at: u64,
}

impl TraceLink {
    pub fn quantity(&self) -> Quantity {
        Quantity::new(self.quantity, self.unit.clone())
    }
}

impl From<&BatchRelation> for TraceLink {
    fn from(r: &BatchRelation) -> Self {
        Self {
            relation_id: r.id,
            from_node: r.input_batch_id,
            to_node: r.output_batch_id,
            quantity: r.quantity_consumed,
            unit: r.unit.clone(),
            recorded_at: r.recorded_at,
        }
    }
}

/// A relation that led back into its own traversal path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleFlag {
    /// Node whose edge closed the loop; its branch stops here.
    pub at: BatchId,
    /// Batch the edge re-entered.
    pub reentered: BatchId,
    pub relation_id: RelationId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationReason {
    DepthLimit,
    NodeLimit,
}

/// Data anomalies met during traversal. None of them abort a trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "anomaly", rename_all = "snake_case")]
pub enum GraphAnomaly {
    /// The far end of a relation does not resolve within the tenant.
    DanglingRelation {
        relation_id: RelationId,
        missing_batch: BatchId,
    },
    /// The store returned a batch owned by another tenant; it was discarded.
    ForeignTenantRecord { batch: BatchId },
    /// A relation with a zero or negative quantity was followed.
    NonPositiveQuantity { relation_id: RelationId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageGraph {
    pub direction: Direction,
    pub root: BatchId,
    /// Discovery order; the root is first.
    pub nodes: Vec<TraceNode>,
    /// Traversal edges between nodes in the graph.
    pub links: Vec<TraceLink>,
    /// Every relation touching a node, including ones off the traversal path.
    pub balance_lines: Vec<TraceLink>,
    pub truncated: bool,
    pub truncation: Option<TruncationReason>,
    pub cycle_flags: Vec<CycleFlag>,
    pub anomalies: Vec<GraphAnomaly>,
    pub stats: TraversalStats,
}

impl LineageGraph {
    pub fn root_node(&self) -> Option<&TraceNode> {
        self.nodes.first()
    }

    pub fn node(&self, id: BatchId) -> Option<&TraceNode> {
        self.nodes.iter().find(|n| n.batch.id == id)
    }

    pub fn node_by_code(&self, code: &str) -> Option<&TraceNode> {
        self.nodes.iter().find(|n| n.batch.code_matches(code))
    }

    pub fn contains(&self, id: BatchId) -> bool {
        self.node(id).is_some()
    }

    /// Deepest level reached (the root is level 0).
    pub fn max_depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }
}
