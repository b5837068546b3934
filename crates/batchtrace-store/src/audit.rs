//! Write-side invariant checks over snapshot records.
//!
//! The production-logging and delivery-receipt workflows are the primary
//! guard for these invariants. This audit lets an operator confirm a snapshot
//! honours them before relying on trace results.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use serde::Serialize;

use batchtrace_core::id::{BatchId, RelationId, TenantId};
use batchtrace_core::model::{normalize_code, BatchRelation};

use crate::snapshot::SnapshotRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum Violation {
    DuplicateBatchId { batch: BatchId },
    DuplicateCode { tenant: TenantId, code: String },
    SelfLoop { relation: RelationId },
    NonPositiveQuantity { relation: RelationId },
    DanglingReference { relation: RelationId, batch: BatchId },
    CrossTenant { relation: RelationId, batch: BatchId },
    /// Batches that sit on at least one cycle (or between two cycles).
    Cycle { tenant: TenantId, batches: Vec<BatchId> },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::DuplicateBatchId { batch } => write!(f, "batch id {batch} appears twice"),
            Violation::DuplicateCode { tenant, code } => {
                write!(f, "code '{code}' is not unique in tenant {tenant}")
            }
            Violation::SelfLoop { relation } => write!(f, "relation {relation} is a self-loop"),
            Violation::NonPositiveQuantity { relation } => {
                write!(f, "relation {relation} has a non-positive quantity")
            }
            Violation::DanglingReference { relation, batch } => {
                write!(f, "relation {relation} references unknown batch {batch}")
            }
            Violation::CrossTenant { relation, batch } => {
                write!(f, "relation {relation} references batch {batch} of another tenant")
            }
            Violation::Cycle { tenant, batches } => write!(
                f,
                "tenant {tenant}: {} batches lie on a consumption cycle",
                batches.len()
            ),
        }
    }
}

/// Check every write-side invariant; returns violations in a stable order.
pub fn audit_records(records: &[SnapshotRecord]) -> Vec<Violation> {
    let mut violations = Vec::new();

    let mut owner: HashMap<BatchId, TenantId> = HashMap::new();
    let mut codes: HashSet<(TenantId, String)> = HashSet::new();
    for record in records {
        if let SnapshotRecord::Batch(b) = record {
            if owner.insert(b.id, b.tenant_id).is_some() {
                violations.push(Violation::DuplicateBatchId { batch: b.id });
            }
            if !codes.insert((b.tenant_id, normalize_code(&b.code))) {
                violations.push(Violation::DuplicateCode {
                    tenant: b.tenant_id,
                    code: b.code.clone(),
                });
            }
        }
    }

    let mut edges: HashMap<TenantId, Vec<&BatchRelation>> = HashMap::new();
    for record in records {
        let SnapshotRecord::Relation {
            tenant_id,
            relation,
        } = record
        else {
            continue;
        };
        if relation.is_self_loop() {
            violations.push(Violation::SelfLoop {
                relation: relation.id,
            });
        }
        if !relation.quantity_consumed.is_positive() {
            violations.push(Violation::NonPositiveQuantity {
                relation: relation.id,
            });
        }
        let mut sound = true;
        for end in [relation.input_batch_id, relation.output_batch_id] {
            match owner.get(&end) {
                None => {
                    sound = false;
                    violations.push(Violation::DanglingReference {
                        relation: relation.id,
                        batch: end,
                    });
                }
                Some(t) if t != tenant_id => {
                    sound = false;
                    violations.push(Violation::CrossTenant {
                        relation: relation.id,
                        batch: end,
                    });
                }
                Some(_) => {}
            }
        }
        if sound {
            edges.entry(*tenant_id).or_default().push(relation);
        }
    }

    let mut tenants: Vec<TenantId> = edges.keys().copied().collect();
    tenants.sort();
    for tenant in tenants {
        let cyclic = cyclic_core(&edges[&tenant]);
        if !cyclic.is_empty() {
            violations.push(Violation::Cycle {
                tenant,
                batches: cyclic,
            });
        }
    }

    violations
}

/// Peel sources (Kahn) and then sinks off the graph; whatever survives both
/// passes lies on a cycle or on a path between cycles.
fn cyclic_core(relations: &[&BatchRelation]) -> Vec<BatchId> {
    let mut succ: HashMap<BatchId, Vec<BatchId>> = HashMap::new();
    let mut pred: HashMap<BatchId, Vec<BatchId>> = HashMap::new();
    let mut nodes: BTreeSet<BatchId> = BTreeSet::new();
    for r in relations {
        succ.entry(r.input_batch_id).or_default().push(r.output_batch_id);
        pred.entry(r.output_batch_id).or_default().push(r.input_batch_id);
        nodes.insert(r.input_batch_id);
        nodes.insert(r.output_batch_id);
    }

    let peel = |alive: &mut BTreeSet<BatchId>,
                inward: &HashMap<BatchId, Vec<BatchId>>,
                outward: &HashMap<BatchId, Vec<BatchId>>| {
        let mut degree: HashMap<BatchId, usize> = alive
            .iter()
            .map(|n| {
                let d = inward
                    .get(n)
                    .map(|v| v.iter().filter(|m| alive.contains(m)).count())
                    .unwrap_or(0);
                (*n, d)
            })
            .collect();
        let mut ready: VecDeque<BatchId> = degree
            .iter()
            .filter_map(|(n, &d)| if d == 0 { Some(*n) } else { None })
            .collect();
        while let Some(n) = ready.pop_front() {
            alive.remove(&n);
            for m in outward.get(&n).into_iter().flatten() {
                if let Some(d) = degree.get_mut(m) {
                    if *d > 0 {
                        *d -= 1;
                        if *d == 0 {
                            ready.push_back(*m);
                        }
                    }
                }
            }
        }
    };

    peel(&mut nodes, &pred, &succ);
    peel(&mut nodes, &succ, &pred);
    nodes.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchtrace_core::id::SiteId;
    use batchtrace_core::model::{Batch, BatchKind, BatchStatus};
    use batchtrace_core::units::{Amount, Unit};

    fn batch(tenant: u128, id: u128, code: &str) -> SnapshotRecord {
        SnapshotRecord::Batch(Batch {
            id: BatchId::from_u128(id),
            code: code.into(),
            kind: BatchKind::ProductionBatch,
            quantity_produced: Amount::from_units(1),
            unit: Unit::Kilogram,
            produced_at: 0,
            site_id: SiteId::from_u128(1),
            tenant_id: TenantId::from_u128(tenant),
            status: BatchStatus::Active,
        })
    }

    fn rel(tenant: u128, id: u128, input: u128, output: u128, qty: i64) -> SnapshotRecord {
        SnapshotRecord::Relation {
            tenant_id: TenantId::from_u128(tenant),
            relation: BatchRelation {
                id: RelationId::from_u128(id),
                input_batch_id: BatchId::from_u128(input),
                output_batch_id: BatchId::from_u128(output),
                quantity_consumed: Amount::from_units(qty),
                unit: Unit::Kilogram,
                recorded_at: 0,
            },
        }
    }

    #[test]
    fn clean_dag_has_no_violations() {
        let records = vec![
            batch(1, 1, "A"),
            batch(1, 2, "B"),
            batch(1, 3, "C"),
            rel(1, 10, 1, 2, 5),
            rel(1, 11, 1, 3, 5),
            rel(1, 12, 2, 3, 5),
        ];
        assert!(audit_records(&records).is_empty());
    }

    #[test]
    fn flags_each_write_side_violation() {
        let records = vec![
            batch(1, 1, "A"),
            batch(1, 2, "a"),
            batch(2, 3, "C"),
            rel(1, 10, 1, 1, 5),
            rel(1, 11, 1, 2, 0),
            rel(1, 12, 1, 99, 5),
            rel(1, 13, 1, 3, 5),
        ];
        let v = audit_records(&records);
        assert!(v.contains(&Violation::DuplicateCode {
            tenant: TenantId::from_u128(1),
            code: "a".into()
        }));
        assert!(v.contains(&Violation::SelfLoop {
            relation: RelationId::from_u128(10)
        }));
        assert!(v.contains(&Violation::NonPositiveQuantity {
            relation: RelationId::from_u128(11)
        }));
        assert!(v.contains(&Violation::DanglingReference {
            relation: RelationId::from_u128(12),
            batch: BatchId::from_u128(99)
        }));
        assert!(v.contains(&Violation::CrossTenant {
            relation: RelationId::from_u128(13),
            batch: BatchId::from_u128(3)
        }));
    }

    #[test]
    fn reports_only_batches_on_the_cycle() {
        // 1 -> 2 -> 3 -> 2, 3 -> 4
        let records = vec![
            batch(1, 1, "A"),
            batch(1, 2, "B"),
            batch(1, 3, "C"),
            batch(1, 4, "D"),
            rel(1, 10, 1, 2, 1),
            rel(1, 11, 2, 3, 1),
            rel(1, 12, 3, 2, 1),
            rel(1, 13, 3, 4, 1),
        ];
        let v = audit_records(&records);
        assert_eq!(
            v,
            vec![Violation::Cycle {
                tenant: TenantId::from_u128(1),
                batches: vec![BatchId::from_u128(2), BatchId::from_u128(3)],
            }]
        );
    }
}
