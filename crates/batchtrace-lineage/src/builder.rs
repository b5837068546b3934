//! Breadth-first lineage graph builder.
//!
//! Each depth level costs one relation lookup for the whole frontier (both
//! edge sides, so the mass balance sees off-path inputs and outputs too) plus
//! at most one batched snapshot lookup for newly discovered batches. Round
//! trips are therefore O(max_depth) no matter how wide the graph fans out.

use std::collections::{HashMap, HashSet};

use batchtrace_core::id::{BatchId, RelationId, TenantId};
use batchtrace_core::model::{Batch, BatchRelation, Direction, EdgeScope};
use batchtrace_store::EdgeStore;

use crate::error::{LineageError, Result};
use crate::frontier::{Arena, TraversalStats, TraversalStep};
use crate::graph::{CycleFlag, GraphAnomaly, LineageGraph, TraceLink, TruncationReason};
use crate::interrupt::Interrupt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildLimits {
    /// Maximum hops from the root (the root is depth 0). A chain traced with
    /// `max_depth = 10` yields 11 nodes: the root plus one per level.
    pub max_depth: u32,
    /// Maximum number of nodes, root included.
    pub max_nodes: usize,
}

impl BuildLimits {
    pub fn new(max_depth: u32, max_nodes: usize) -> Self {
        Self {
            max_depth,
            max_nodes,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(LineageError::InvalidLimits("max_depth must be positive".into()));
        }
        if self.max_nodes == 0 {
            return Err(LineageError::InvalidLimits("max_nodes must be positive".into()));
        }
        Ok(())
    }
}

pub struct LineageGraphBuilder<S> {
    store: S,
}

impl<S: EdgeStore> LineageGraphBuilder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn build(
        &self,
        tenant: TenantId,
        root_code: &str,
        direction: Direction,
        limits: BuildLimits,
        interrupt: &Interrupt,
    ) -> Result<LineageGraph> {
        limits.validate()?;

        interrupt.check()?;
        let root = self
            .store
            .get_batch_by_code(tenant, root_code)?
            .filter(|b| b.tenant_id == tenant && b.code_matches(root_code))
            .ok_or_else(|| LineageError::NotFound {
                tenant,
                code: root_code.to_string(),
            })?;

        let mut walk = Walk::new(tenant, direction, limits, root);
        walk.stats.round_trips += 1;

        let mut frontier = vec![0usize];
        let mut depth = 0u32;
        while !frontier.is_empty() {
            let admit = depth < limits.max_depth;
            frontier = self.expand_level(&mut walk, &frontier, depth, admit, interrupt)?;
            if !admit {
                break;
            }
            depth += 1;
            walk.stats.levels_expanded += 1;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            %tenant,
            root = %root_code,
            %direction,
            nodes = walk.arena.len(),
            links = walk.links.len(),
            truncated = walk.truncation.is_some(),
            cycles = walk.cycle_flags.len(),
            round_trips = walk.stats.round_trips,
            "lineage graph built"
        );

        Ok(walk.finish())
    }

    /// Process one frontier. With `admit == false` this is the probe past the
    /// depth bound: known nodes still get their links and balance lines, and
    /// an edge to an undiscovered batch the store can resolve marks the trace
    /// as truncated.
    fn expand_level(
        &self,
        walk: &mut Walk,
        frontier: &[usize],
        depth: u32,
        admit: bool,
        interrupt: &Interrupt,
    ) -> Result<Vec<usize>> {
        let ids: Vec<BatchId> = frontier.iter().map(|&i| walk.arena.id_at(i)).collect();
        walk.stats.max_frontier_size = walk.stats.max_frontier_size.max(ids.len());

        interrupt.check()?;
        let mut relations =
            self.store
                .get_relations_for_batches_at_level(walk.tenant, &ids, EdgeScope::Both)?;
        walk.stats.round_trips += 1;
        relations.sort_by(|a, b| (a.recorded_at, a.id).cmp(&(b.recorded_at, b.id)));

        let in_frontier: HashSet<BatchId> = ids.iter().copied().collect();
        let direction = walk.direction;

        // Traversal edges leave a frontier node; order them by frontier
        // position so discovery order is stable.
        let mut traversal: Vec<(usize, &BatchRelation)> = Vec::new();
        for rel in &relations {
            if !rel.touches(&in_frontier) {
                continue;
            }
            walk.add_balance_line(rel);
            let near = rel.near_end(direction);
            if in_frontier.contains(&near) {
                if let Some(idx) = walk.arena.index_of(near) {
                    traversal.push((idx, rel));
                }
            }
        }
        traversal.sort_by_key(|(idx, _)| *idx);

        let wanted = walk.undiscovered_far_ends(&traversal);
        let fetched = self.fetch_batches(walk, &wanted, interrupt)?;

        let edges: Vec<(usize, BatchId)> = traversal
            .iter()
            .map(|(idx, rel)| (*idx, rel.far_end(direction)))
            .collect();
        walk.arena.prepare_level(&edges);

        let mut next = Vec::new();
        for (near_idx, rel) in traversal {
            if !rel.quantity_consumed.is_positive() {
                walk.anomalies.push(GraphAnomaly::NonPositiveQuantity {
                    relation_id: rel.id,
                });
            }
            let far = rel.far_end(direction);
            match walk.arena.classify(near_idx, far) {
                TraversalStep::CycleStop(_) => {
                    walk.arena.flag_cycle(near_idx);
                    walk.cycle_flags.push(CycleFlag {
                        at: walk.arena.id_at(near_idx),
                        reentered: far,
                        relation_id: rel.id,
                    });
                    walk.add_link(rel);
                }
                TraversalStep::Continue(far_idx) => {
                    walk.arena.add_pred(far_idx, near_idx);
                    walk.add_link(rel);
                }
                TraversalStep::Expand => {
                    let Some(batch) = fetched.get(&far) else {
                        if !walk.foreign.contains(&far) {
                            walk.anomalies.push(GraphAnomaly::DanglingRelation {
                                relation_id: rel.id,
                                missing_batch: far,
                            });
                        }
                        continue;
                    };
                    if !admit {
                        walk.truncate(TruncationReason::DepthLimit);
                        continue;
                    }
                    if walk.arena.len() >= walk.limits.max_nodes {
                        walk.truncate(TruncationReason::NodeLimit);
                        continue;
                    }
                    let idx = walk.arena.push(batch.clone(), depth + 1, Some(near_idx));
                    walk.add_link(rel);
                    next.push(idx);
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(
            depth,
            frontier = ids.len(),
            relations = relations.len(),
            discovered = next.len(),
            probe = !admit,
            "expanded level"
        );

        Ok(next)
    }

    fn fetch_batches(
        &self,
        walk: &mut Walk,
        wanted: &[BatchId],
        interrupt: &Interrupt,
    ) -> Result<HashMap<BatchId, Batch>> {
        if wanted.is_empty() {
            return Ok(HashMap::new());
        }
        interrupt.check()?;
        let batches = self.store.get_batches_by_ids(walk.tenant, wanted)?;
        walk.stats.round_trips += 1;

        let mut out = HashMap::with_capacity(batches.len());
        for b in batches {
            if b.tenant_id != walk.tenant {
                #[cfg(feature = "tracing")]
                tracing::warn!(batch = %b.id, "store returned a batch from another tenant; discarded");
                if walk.foreign.insert(b.id) {
                    walk.anomalies
                        .push(GraphAnomaly::ForeignTenantRecord { batch: b.id });
                }
                continue;
            }
            out.insert(b.id, b);
        }
        Ok(out)
    }
}

/// Mutable state of one build.
struct Walk {
    tenant: TenantId,
    direction: Direction,
    limits: BuildLimits,
    arena: Arena,
    links: Vec<TraceLink>,
    link_ids: HashSet<RelationId>,
    balance_lines: Vec<TraceLink>,
    balance_ids: HashSet<RelationId>,
    truncation: Option<TruncationReason>,
    cycle_flags: Vec<CycleFlag>,
    anomalies: Vec<GraphAnomaly>,
    foreign: HashSet<BatchId>,
    stats: TraversalStats,
}

impl Walk {
    fn new(tenant: TenantId, direction: Direction, limits: BuildLimits, root: Batch) -> Self {
        Self {
            tenant,
            direction,
            limits,
            arena: Arena::with_root(root),
            links: Vec::new(),
            link_ids: HashSet::new(),
            balance_lines: Vec::new(),
            balance_ids: HashSet::new(),
            truncation: None,
            cycle_flags: Vec::new(),
            anomalies: Vec::new(),
            foreign: HashSet::new(),
            stats: TraversalStats::default(),
        }
    }

    fn add_link(&mut self, rel: &BatchRelation) {
        if self.link_ids.insert(rel.id) {
            self.links.push(TraceLink::from(rel));
        }
    }

    fn add_balance_line(&mut self, rel: &BatchRelation) {
        if self.balance_ids.insert(rel.id) {
            self.balance_lines.push(TraceLink::from(rel));
        }
    }

    /// The first reason wins; a node-limit cut is the more severe one to report.
    fn truncate(&mut self, reason: TruncationReason) {
        match self.truncation {
            None => self.truncation = Some(reason),
            Some(TruncationReason::DepthLimit) if reason == TruncationReason::NodeLimit => {
                self.truncation = Some(reason)
            }
            Some(_) => {}
        }
    }

    fn undiscovered_far_ends(&self, traversal: &[(usize, &BatchRelation)]) -> Vec<BatchId> {
        let mut seen = HashSet::new();
        traversal
            .iter()
            .map(|(_, rel)| rel.far_end(self.direction))
            .filter(|far| self.arena.index_of(*far).is_none() && seen.insert(*far))
            .collect()
    }

    fn finish(self) -> LineageGraph {
        let root = self.arena.id_at(0);
        let ancestry_steps = self.arena.ancestry_steps();
        LineageGraph {
            direction: self.direction,
            root,
            nodes: self.arena.into_nodes(),
            links: self.links,
            balance_lines: self.balance_lines,
            truncated: self.truncation.is_some(),
            truncation: self.truncation,
            cycle_flags: self.cycle_flags,
            anomalies: self.anomalies,
            stats: TraversalStats {
                ancestry_steps,
                ..self.stats
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchtrace_core::id::SiteId;
    use batchtrace_core::model::{BatchKind, BatchStatus};
    use batchtrace_core::units::{Amount, Unit};
    use batchtrace_store::MemoryEdgeStore;

    use crate::verify::{assert_breadth_first, assert_well_formed, assert_within_limits};

    const T: TenantId = TenantId::from_u128(0xA);

    fn batch(id: u128, code: &str) -> Batch {
        Batch {
            id: BatchId::from_u128(id),
            code: code.into(),
            kind: BatchKind::ProductionBatch,
            quantity_produced: Amount::from_units(1),
            unit: Unit::Kilogram,
            produced_at: 0,
            site_id: SiteId::from_u128(1),
            tenant_id: T,
            status: BatchStatus::Active,
        }
    }

    fn rel(id: u128, input: u128, output: u128, qty: i64) -> BatchRelation {
        BatchRelation {
            id: RelationId::from_u128(id),
            input_batch_id: BatchId::from_u128(input),
            output_batch_id: BatchId::from_u128(output),
            quantity_consumed: Amount::from_units(qty),
            unit: Unit::Kilogram,
            recorded_at: id as u64,
        }
    }

    fn store(batches: &[(u128, &str)], rels: &[(u128, u128, u128)]) -> MemoryEdgeStore {
        let s = MemoryEdgeStore::new();
        for (id, code) in batches {
            s.insert_batch(batch(*id, code)).unwrap();
        }
        for (id, i, o) in rels {
            s.insert_relation(T, rel(*id, *i, *o, 1));
        }
        s
    }

    fn build(s: &MemoryEdgeStore, code: &str, dir: Direction, depth: u32, nodes: usize) -> LineageGraph {
        LineageGraphBuilder::new(s)
            .build(T, code, dir, BuildLimits::new(depth, nodes), &Interrupt::none())
            .unwrap()
    }

    #[test]
    fn follows_every_fan_out_edge() {
        let s = store(
            &[(1, "A"), (2, "B"), (3, "C"), (4, "D")],
            &[(10, 1, 2), (11, 1, 3), (12, 1, 4)],
        );
        let g = build(&s, "a", Direction::Forward, 8, 100);
        assert_eq!(g.nodes.len(), 4);
        assert_eq!(g.links.len(), 3);
        assert!(!g.truncated);
        assert!(g.nodes[1..].iter().all(|n| n.depth == 1));
    }

    #[test]
    fn diamond_yields_one_node_with_two_links() {
        let s = store(
            &[(1, "A"), (2, "B"), (3, "C"), (4, "D")],
            &[(10, 1, 2), (11, 1, 3), (12, 2, 4), (13, 3, 4)],
        );
        let g = build(&s, "A", Direction::Forward, 8, 100);
        assert_well_formed(&g);
        assert_breadth_first(&g);
        assert_eq!(g.nodes.len(), 4);
        assert_eq!(g.links.len(), 4);
        assert!(g.cycle_flags.is_empty());
        assert_eq!(g.node(BatchId::from_u128(4)).unwrap().depth, 2);
    }

    #[test]
    fn two_node_cycle_terminates_and_is_flagged() {
        let s = store(&[(1, "A"), (2, "B")], &[(10, 1, 2), (11, 2, 1)]);
        let g = build(&s, "A", Direction::Forward, 50, 100);
        assert_eq!(g.nodes.len(), 2);
        assert_eq!(
            g.cycle_flags,
            vec![CycleFlag {
                at: BatchId::from_u128(2),
                reentered: BatchId::from_u128(1),
                relation_id: RelationId::from_u128(11),
            }]
        );
        assert!(g.node(BatchId::from_u128(2)).unwrap().cycle_guard_triggered);
        assert!(!g.truncated);
    }

    #[test]
    fn depth_bound_reports_truncation_only_when_more_exists() {
        let s = store(
            &[(1, "A"), (2, "B"), (3, "C")],
            &[(10, 1, 2), (11, 2, 3)],
        );
        let cut = build(&s, "A", Direction::Forward, 1, 100);
        assert_eq!(cut.nodes.len(), 2);
        assert_eq!(cut.truncation, Some(TruncationReason::DepthLimit));

        let exact = build(&s, "A", Direction::Forward, 2, 100);
        assert_eq!(exact.nodes.len(), 3);
        assert!(!exact.truncated);
    }

    #[test]
    fn dangling_edge_past_the_depth_bound_is_not_truncation() {
        let s = store(&[(1, "A"), (2, "B")], &[(10, 1, 2), (11, 2, 99)]);
        let g = build(&s, "A", Direction::Forward, 1, 100);
        assert_eq!(g.nodes.len(), 2);
        assert!(!g.truncated);
        assert_eq!(
            g.anomalies,
            vec![GraphAnomaly::DanglingRelation {
                relation_id: RelationId::from_u128(11),
                missing_batch: BatchId::from_u128(99),
            }]
        );
    }

    #[test]
    fn dense_layers_skip_the_ancestry_walk() {
        // Root feeds 40 batches; each layer of 40 feeds every batch of the next.
        let width = 40u128;
        let layers = 6u128;
        let s = MemoryEdgeStore::new();
        s.insert_batch(batch(1, "ROOT")).unwrap();
        let id_of = |layer: u128, i: u128| 1_000 * (layer + 1) + i;
        let mut rel_id = 1_000_000u128;
        for layer in 0..layers {
            for i in 0..width {
                s.insert_batch(batch(id_of(layer, i), &format!("L{layer}-{i}"))).unwrap();
                let inputs: Vec<u128> = if layer == 0 {
                    vec![1]
                } else {
                    (0..width).map(|j| id_of(layer - 1, j)).collect()
                };
                for input in inputs {
                    rel_id += 1;
                    s.insert_relation(T, rel(rel_id, input, id_of(layer, i), 1));
                }
            }
        }

        let g = build(&s, "ROOT", Direction::Forward, 16, 5_000);
        assert_eq!(g.nodes.len(), 1 + (width * layers) as usize);
        assert_eq!(g.links.len(), (width + width * width * (layers - 1)) as usize);
        assert!(g.cycle_flags.is_empty());
        assert_eq!(g.stats.ancestry_steps, 0);
        assert_within_limits(&g, 16, 5_000);
    }

    #[test]
    fn foreign_batch_from_the_store_is_dropped() {
        struct Leaky(MemoryEdgeStore);

        impl EdgeStore for Leaky {
            fn get_batch_by_code(
                &self,
                tenant: TenantId,
                code: &str,
            ) -> batchtrace_store::Result<Option<Batch>> {
                self.0.get_batch_by_code(tenant, code)
            }

            fn get_batches_by_ids(
                &self,
                tenant: TenantId,
                ids: &[BatchId],
            ) -> batchtrace_store::Result<Vec<Batch>> {
                let mut out = self.0.get_batches_by_ids(tenant, ids)?;
                for b in &mut out {
                    if b.id == BatchId::from_u128(3) {
                        b.tenant_id = TenantId::from_u128(0xB);
                    }
                }
                Ok(out)
            }

            fn get_relations_for_batches_at_level(
                &self,
                tenant: TenantId,
                ids: &[BatchId],
                scope: EdgeScope,
            ) -> batchtrace_store::Result<Vec<BatchRelation>> {
                self.0.get_relations_for_batches_at_level(tenant, ids, scope)
            }
        }

        let inner = store(&[(1, "A"), (2, "B"), (3, "C")], &[(10, 1, 2), (11, 1, 3)]);
        let g = LineageGraphBuilder::new(Leaky(inner))
            .build(T, "A", Direction::Forward, BuildLimits::new(4, 100), &Interrupt::none())
            .unwrap();
        assert_eq!(g.nodes.len(), 2);
        assert!(g.node(BatchId::from_u128(3)).is_none());
        assert!(g.links.iter().all(|l| l.to_node != BatchId::from_u128(3)));
        assert_eq!(
            g.anomalies,
            vec![GraphAnomaly::ForeignTenantRecord {
                batch: BatchId::from_u128(3),
            }]
        );
    }

    #[test]
    fn node_bound_cuts_and_flags() {
        let s = store(
            &[(1, "A"), (2, "B"), (3, "C"), (4, "D")],
            &[(10, 1, 2), (11, 1, 3), (12, 1, 4)],
        );
        let g = build(&s, "A", Direction::Forward, 8, 3);
        assert_within_limits(&g, 8, 3);
        assert_eq!(g.nodes.len(), 3);
        assert_eq!(g.links.len(), 2);
        assert_eq!(g.truncation, Some(TruncationReason::NodeLimit));
    }

    #[test]
    fn dangling_far_end_is_reported_not_followed() {
        let s = store(&[(1, "A")], &[(10, 1, 99)]);
        let g = build(&s, "A", Direction::Forward, 4, 100);
        assert_eq!(g.nodes.len(), 1);
        assert!(g.links.is_empty());
        assert_eq!(
            g.anomalies,
            vec![GraphAnomaly::DanglingRelation {
                relation_id: RelationId::from_u128(10),
                missing_batch: BatchId::from_u128(99),
            }]
        );
    }

    #[test]
    fn unknown_root_is_not_found() {
        let s = store(&[(1, "A")], &[]);
        let err = LineageGraphBuilder::new(&s)
            .build(T, "Z", Direction::Backward, BuildLimits::new(3, 10), &Interrupt::none())
            .unwrap_err();
        assert!(matches!(err, LineageError::NotFound { .. }));
    }

    #[test]
    fn zero_limits_are_rejected_before_any_lookup() {
        let s = store(&[(1, "A")], &[]);
        let err = LineageGraphBuilder::new(&s)
            .build(T, "A", Direction::Forward, BuildLimits::new(0, 10), &Interrupt::none())
            .unwrap_err();
        assert!(matches!(err, LineageError::InvalidLimits(_)));
    }
}
