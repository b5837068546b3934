//! Arena-indexed traversal state.
//!
//! Nodes live in a `Vec` in discovery order with a `BatchId → index` map.
//! Each node keeps the indices it was reached from (its traversal
//! predecessors). An edge `near → far` closes a loop exactly when `far` is
//! `near` itself or one of `near`'s ancestors along *some* discovered path.
//! A batch reached through two independent branches is an ancestor of
//! neither, so diamonds are not cycles.
//!
//! Before a level is classified, one Tarjan pass over the discovered edges
//! plus the level's edges into known nodes finds the strongly connected
//! components. Only an edge whose ends share a component can close a loop,
//! so the ancestry walk runs inside that component and never at all on a DAG.

use std::collections::{HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use batchtrace_core::id::BatchId;
use batchtrace_core::model::Batch;

use crate::graph::TraceNode;

/// Outcome of classifying one edge against the traversal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalStep {
    /// The far end is new; admit it at the next level.
    Expand,
    /// The far end was already discovered on an independent branch.
    Continue(usize),
    /// The far end is on the near end's own path: stop this branch.
    CycleStop(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalStats {
    /// Depth levels whose frontier was expanded (probe levels excluded).
    pub levels_expanded: u32,
    /// Store calls made, including the root lookup and any depth probe.
    pub round_trips: u32,
    /// Largest frontier handed to a single relation lookup.
    pub max_frontier_size: usize,
    /// Nodes visited by cycle-guard ancestry walks.
    #[serde(default)]
    pub ancestry_steps: u64,
}

#[derive(Default)]
pub(crate) struct Arena {
    nodes: Vec<TraceNode>,
    index: HashMap<BatchId, usize>,
    preds: Vec<Vec<usize>>,
    /// Cyclic component of each node as of the last `prepare_level`.
    /// Singletons and nodes pushed since then have none.
    component: Vec<Option<usize>>,
    ancestry_steps: u64,
}

impl Arena {
    pub(crate) fn with_root(root: Batch) -> Self {
        let mut arena = Self::default();
        arena.push(root, 0, None);
        arena
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn index_of(&self, id: BatchId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub(crate) fn id_at(&self, idx: usize) -> BatchId {
        self.nodes[idx].batch.id
    }

    pub(crate) fn ancestry_steps(&self) -> u64 {
        self.ancestry_steps
    }

    pub(crate) fn push(&mut self, batch: Batch, depth: u32, pred: Option<usize>) -> usize {
        let idx = self.nodes.len();
        self.index.insert(batch.id, idx);
        self.nodes.push(TraceNode {
            batch,
            depth,
            cycle_guard_triggered: false,
        });
        self.preds.push(pred.into_iter().collect());
        idx
    }

    pub(crate) fn add_pred(&mut self, idx: usize, pred: usize) {
        if !self.preds[idx].contains(&pred) {
            self.preds[idx].push(pred);
        }
    }

    pub(crate) fn flag_cycle(&mut self, idx: usize) {
        self.nodes[idx].cycle_guard_triggered = true;
    }

    /// Compute the cyclic components for a level whose traversal edges are
    /// `edges` (`near` index, `far` id). Must run before that level's
    /// `classify` calls.
    pub(crate) fn prepare_level(&mut self, edges: &[(usize, BatchId)]) {
        self.component.clear();
        let rejoins: Vec<(usize, usize)> = edges
            .iter()
            .filter_map(|&(near, far)| self.index_of(far).map(|f| (near, f)))
            .filter(|(near, f)| near != f)
            .collect();
        // Edges into undiscovered batches cannot close a loop.
        if rejoins.is_empty() {
            return;
        }

        let mut graph = DiGraph::<(), ()>::with_capacity(self.nodes.len(), rejoins.len());
        for _ in 0..self.nodes.len() {
            graph.add_node(());
        }
        for (idx, preds) in self.preds.iter().enumerate() {
            for &p in preds {
                graph.add_edge(NodeIndex::new(p), NodeIndex::new(idx), ());
            }
        }
        for &(near, far) in &rejoins {
            graph.add_edge(NodeIndex::new(near), NodeIndex::new(far), ());
        }

        self.component = vec![None; self.nodes.len()];
        for (c, scc) in tarjan_scc(&graph).into_iter().enumerate() {
            if scc.len() > 1 {
                for n in scc {
                    self.component[n.index()] = Some(c);
                }
            }
        }
    }

    /// Classify the edge `near → far` (traversal orientation).
    pub(crate) fn classify(&mut self, near: usize, far: BatchId) -> TraversalStep {
        let Some(f) = self.index_of(far) else {
            return TraversalStep::Expand;
        };
        if f == near {
            return TraversalStep::CycleStop(f);
        }
        if let (Some(a), Some(b)) = (self.component_of(near), self.component_of(f)) {
            if a == b && self.is_on_path_to(f, near, a) {
                return TraversalStep::CycleStop(f);
            }
        }
        TraversalStep::Continue(f)
    }

    fn component_of(&self, idx: usize) -> Option<usize> {
        self.component.get(idx).copied().flatten()
    }

    /// Whether `target` is one of `from`'s traversal ancestors. Every node on
    /// such a path lies in `from`'s component, so the walk stays inside it.
    fn is_on_path_to(&mut self, target: usize, from: usize, component: usize) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![from];
        let mut found = false;
        while let Some(n) = stack.pop() {
            if n == target {
                found = true;
                break;
            }
            if !seen.insert(n) {
                continue;
            }
            self.ancestry_steps += 1;
            stack.extend(
                self.preds[n]
                    .iter()
                    .copied()
                    .filter(|p| !seen.contains(p) && self.component_of(*p) == Some(component)),
            );
        }
        found
    }

    pub(crate) fn into_nodes(self) -> Vec<TraceNode> {
        self.nodes
    }
}
