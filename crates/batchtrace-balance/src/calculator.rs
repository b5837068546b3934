//! Per-node and aggregate mass balance.
//!
//! For a node, `total_input` sums the lines whose `to_node` is the node and
//! `total_output` sums the lines whose `from_node` is the node. Every line is
//! converted to the base unit of its dimension first; the dimension of a node
//! is fixed by its first line (or by the batch's own unit when it has none).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use batchtrace_core::error::Error;
use batchtrace_core::id::{BatchId, RelationId};
use batchtrace_core::units::{Amount, Unit};
use batchtrace_lineage::{TraceLink, TraceNode};

use crate::record::MassBalanceRecord;
use crate::tolerance::{ToleranceVerdict, VarianceTolerance};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BalanceOutcome {
    Computed {
        /// Base-unit figures.
        record: MassBalanceRecord,
        /// The same figures in the coarsest unit the node's lines used.
        display: MassBalanceRecord,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        verdict: Option<ToleranceVerdict>,
    },
    /// A line's unit has a different dimension from the node's other lines.
    UnitMismatch {
        expected: Unit,
        found: Unit,
        relation_id: RelationId,
    },
    /// A sum left the representable range.
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMassBalance {
    pub batch_id: BatchId,
    pub code: String,
    pub outcome: BalanceOutcome,
}

impl NodeMassBalance {
    pub fn record(&self) -> Option<&MassBalanceRecord> {
        match &self.outcome {
            BalanceOutcome::Computed { record, .. } => Some(record),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassBalanceReport {
    /// One entry per node, in node order.
    pub per_node: Vec<NodeMassBalance>,
    /// The root node's record, when it computed.
    pub aggregate: Option<MassBalanceRecord>,
}

impl MassBalanceReport {
    pub fn for_batch(&self, id: BatchId) -> Option<&NodeMassBalance> {
        self.per_node.iter().find(|n| n.batch_id == id)
    }

    pub fn mismatches(&self) -> impl Iterator<Item = &NodeMassBalance> {
        self.per_node
            .iter()
            .filter(|n| matches!(n.outcome, BalanceOutcome::UnitMismatch { .. }))
    }

    pub fn exceeding_tolerance(&self) -> impl Iterator<Item = &NodeMassBalance> {
        self.per_node.iter().filter(|n| {
            matches!(
                n.outcome,
                BalanceOutcome::Computed {
                    verdict: Some(ToleranceVerdict::Exceeds),
                    ..
                }
            )
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MassBalanceCalculator {
    tolerance: Option<VarianceTolerance>,
}

impl MassBalanceCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(mut self, tolerance: Option<VarianceTolerance>) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn compute(&self, nodes: &[TraceNode], lines: &[TraceLink], root: BatchId) -> MassBalanceReport {
        let mut inputs: HashMap<BatchId, Vec<&TraceLink>> = HashMap::new();
        let mut outputs: HashMap<BatchId, Vec<&TraceLink>> = HashMap::new();
        let mut seen = HashSet::new();
        for line in lines {
            if !seen.insert(line.relation_id) {
                continue;
            }
            inputs.entry(line.to_node).or_default().push(line);
            outputs.entry(line.from_node).or_default().push(line);
        }

        let none = Vec::new();
        let per_node: Vec<NodeMassBalance> = nodes
            .iter()
            .map(|n| {
                let id = n.batch.id;
                let ins = inputs.get(&id).unwrap_or(&none);
                let outs = outputs.get(&id).unwrap_or(&none);
                NodeMassBalance {
                    batch_id: id,
                    code: n.batch.code.clone(),
                    outcome: self.node_outcome(&n.batch.unit, ins, outs),
                }
            })
            .collect();

        let aggregate = per_node
            .iter()
            .find(|n| n.batch_id == root)
            .and_then(|n| n.record().cloned());

        MassBalanceReport {
            per_node,
            aggregate,
        }
    }

    fn node_outcome(&self, batch_unit: &Unit, ins: &[&TraceLink], outs: &[&TraceLink]) -> BalanceOutcome {
        let first = ins.iter().chain(outs).next().map(|l| &l.unit);
        let base = first.unwrap_or(batch_unit).base();

        let mut display = base.clone();
        for line in ins.iter().chain(outs) {
            if !line.unit.is_compatible(&base) {
                return BalanceOutcome::UnitMismatch {
                    expected: first.cloned().unwrap_or_else(|| base.clone()),
                    found: line.unit.clone(),
                    relation_id: line.relation_id,
                };
            }
            if line.unit.magnitude() > display.magnitude() {
                display = line.unit.clone();
            }
        }

        let totals = sum_in(ins, &base)
            .and_then(|i| Ok((i, sum_in(outs, &base)?)))
            .and_then(|(i, o)| MassBalanceRecord::new(i, o, base))
            .and_then(|r| Ok((r.in_unit(&display)?, r)));
        let Ok((display, record)) = totals else {
            return BalanceOutcome::Overflow;
        };
        let verdict = self.tolerance.map(|t| t.classify(&record));
        BalanceOutcome::Computed {
            record,
            display,
            verdict,
        }
    }
}

fn sum_in(lines: &[&TraceLink], base: &Unit) -> Result<Amount, Error> {
    lines.iter().try_fold(Amount::ZERO, |acc, line| {
        let q = line.quantity().convert_to(base)?;
        acc.checked_add(q.amount)
            .ok_or(Error::Overflow("summing line quantities"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchtrace_core::id::{SiteId, TenantId};
    use batchtrace_core::model::{Batch, BatchKind, BatchStatus};

    fn node(id: u128, code: &str, unit: Unit) -> TraceNode {
        TraceNode {
            batch: Batch {
                id: BatchId::from_u128(id),
                code: code.into(),
                kind: BatchKind::ProductionBatch,
                quantity_produced: Amount::from_units(1),
                unit,
                produced_at: 0,
                site_id: SiteId::from_u128(1),
                tenant_id: TenantId::from_u128(1),
                status: BatchStatus::Active,
            },
            depth: 0,
            cycle_guard_triggered: false,
        }
    }

    fn line(id: u128, from: u128, to: u128, qty: &str, unit: Unit) -> TraceLink {
        TraceLink {
            relation_id: RelationId::from_u128(id),
            from_node: BatchId::from_u128(from),
            to_node: BatchId::from_u128(to),
            quantity: qty.parse().unwrap(),
            unit,
            recorded_at: 0,
        }
    }

    fn amt(s: &str) -> Amount {
        s.parse().unwrap()
    }

    /// Flour (1) and water (5) into dough (2), dough into two loaves (3, 4).
    fn bakery() -> (Vec<TraceNode>, Vec<TraceLink>) {
        let nodes = vec![
            node(1, "RM-FLOUR-001", Unit::Kilogram),
            node(2, "DOUGH-550", Unit::Kilogram),
            node(3, "LOAF-9001", Unit::Kilogram),
            node(4, "LOAF-9002", Unit::Kilogram),
        ];
        let lines = vec![
            line(10, 1, 2, "100", Unit::Kilogram),
            line(11, 5, 2, "60", Unit::Kilogram),
            line(12, 2, 3, "80", Unit::Kilogram),
            line(13, 2, 4, "78", Unit::Kilogram),
        ];
        (nodes, lines)
    }

    #[test]
    fn dough_balances_inputs_against_outputs() {
        let (nodes, lines) = bakery();
        let report = MassBalanceCalculator::new().compute(&nodes, &lines, BatchId::from_u128(1));
        let dough = report.for_batch(BatchId::from_u128(2)).unwrap();
        let BalanceOutcome::Computed { record, display, verdict } = &dough.outcome else {
            panic!("dough did not compute: {:?}", dough.outcome);
        };
        assert_eq!(record.unit, Unit::Gram);
        assert_eq!(record.total_input, amt("160000"));
        assert_eq!(record.total_output, amt("158000"));
        assert_eq!(record.variance, amt("2000"));
        assert!((record.variance_percent.unwrap() - 1.25).abs() < 1e-9);
        assert_eq!(display.unit, Unit::Kilogram);
        assert_eq!(display.variance, amt("2"));
        assert_eq!(*verdict, None);
    }

    #[test]
    fn aggregate_is_the_root_record() {
        let (nodes, lines) = bakery();
        let report = MassBalanceCalculator::new().compute(&nodes, &lines, BatchId::from_u128(1));
        let agg = report.aggregate.unwrap();
        assert_eq!(agg.total_input, Amount::ZERO);
        assert_eq!(agg.total_output, amt("100000"));
        assert_eq!(agg.variance_percent, None);
    }

    #[test]
    fn mixed_mass_units_normalize_exactly() {
        let nodes = vec![node(1, "MIX", Unit::Kilogram)];
        let lines = vec![
            line(10, 7, 1, "1", Unit::Pound),
            line(11, 8, 1, "16", Unit::Ounce),
            line(12, 1, 9, "907.18474", Unit::Gram),
        ];
        let report = MassBalanceCalculator::new().compute(&nodes, &lines, BatchId::from_u128(1));
        let rec = report.aggregate.unwrap();
        assert_eq!(rec.total_input, amt("907.18474"));
        assert!(rec.is_balanced());
    }

    #[test]
    fn mismatch_is_isolated_to_its_node() {
        let nodes = vec![
            node(1, "SYRUP", Unit::Litre),
            node(2, "CANDY", Unit::Kilogram),
        ];
        let lines = vec![
            line(10, 9, 1, "5", Unit::Litre),
            line(11, 1, 2, "4", Unit::Kilogram),
            line(12, 2, 8, "3", Unit::Kilogram),
        ];
        let report = MassBalanceCalculator::new().compute(&nodes, &lines, BatchId::from_u128(1));
        assert_eq!(
            report.for_batch(BatchId::from_u128(1)).unwrap().outcome,
            BalanceOutcome::UnitMismatch {
                expected: Unit::Litre,
                found: Unit::Kilogram,
                relation_id: RelationId::from_u128(11),
            }
        );
        assert!(report.aggregate.is_none());
        assert_eq!(report.mismatches().count(), 1);
        let candy = report.for_batch(BatchId::from_u128(2)).unwrap();
        assert_eq!(candy.record().unwrap().variance, amt("1000"));
    }

    #[test]
    fn tolerance_classifies_each_node() {
        let (nodes, lines) = bakery();
        let report = MassBalanceCalculator::new()
            .with_tolerance(Some(VarianceTolerance::new(1.0)))
            .compute(&nodes, &lines, BatchId::from_u128(1));
        let verdict = |id: u128| match &report.for_batch(BatchId::from_u128(id)).unwrap().outcome {
            BalanceOutcome::Computed { verdict, .. } => *verdict,
            other => panic!("unexpected outcome {other:?}"),
        };
        // Dough loses 1.25 %. The flour has output but no recorded input.
        assert_eq!(verdict(2), Some(ToleranceVerdict::Exceeds));
        assert_eq!(verdict(1), Some(ToleranceVerdict::Exceeds));

        let lenient = MassBalanceCalculator::new()
            .with_tolerance(Some(VarianceTolerance::new(2.0)))
            .compute(&nodes, &lines, BatchId::from_u128(1));
        let codes: Vec<_> = lenient.exceeding_tolerance().map(|n| n.code.as_str()).collect();
        assert_eq!(codes, vec!["RM-FLOUR-001", "LOAF-9001", "LOAF-9002"]);
    }

    #[test]
    fn node_without_lines_balances_in_its_own_base_unit() {
        let nodes = vec![node(1, "LONE", Unit::Litre)];
        let report = MassBalanceCalculator::new().compute(&nodes, &[], BatchId::from_u128(1));
        let rec = report.aggregate.unwrap();
        assert_eq!(rec.unit, Unit::Millilitre);
        assert!(rec.is_balanced());
    }

    #[test]
    fn report_serializes_with_status_tags() {
        let (nodes, lines) = bakery();
        let report = MassBalanceCalculator::new().compute(&nodes, &lines, BatchId::from_u128(1));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["per_node"][1]["outcome"]["status"], "computed");
        assert_eq!(json["per_node"][1]["outcome"]["record"]["variance"], "2000");
    }
}
