//! Debug-time verification helpers for lineage graphs.
//!
//! Intended for tests and debug builds; each helper panics with a message
//! naming the offending node or link.

use std::collections::HashSet;

use batchtrace_core::id::BatchId;

use crate::graph::LineageGraph;

/// Root first at depth 0, no duplicate nodes, every link between known nodes.
pub fn assert_well_formed(graph: &LineageGraph) {
    let Some(root) = graph.root_node() else {
        panic!("graph has no root node");
    };
    assert_eq!(root.batch.id, graph.root, "first node is not the root");
    assert_eq!(root.depth, 0, "root is not at depth 0");

    let mut ids = HashSet::<BatchId>::new();
    for n in &graph.nodes {
        assert!(ids.insert(n.batch.id), "node {} appears twice", n.batch.id);
    }
    for l in &graph.links {
        assert!(
            ids.contains(&l.from_node) && ids.contains(&l.to_node),
            "link {} leaves the node set",
            l.relation_id
        );
    }
    assert_eq!(
        graph.truncated,
        graph.truncation.is_some(),
        "truncated flag and reason disagree"
    );
}

/// Discovery order never goes back up a level.
pub fn assert_breadth_first(graph: &LineageGraph) {
    for pair in graph.nodes.windows(2) {
        assert!(
            pair[0].depth <= pair[1].depth,
            "node {} (depth {}) discovered after node {} (depth {})",
            pair[1].batch.id,
            pair[1].depth,
            pair[0].batch.id,
            pair[0].depth
        );
    }
}

/// Every node respects the ceilings the graph was built with.
pub fn assert_within_limits(graph: &LineageGraph, max_depth: u32, max_nodes: usize) {
    assert!(
        graph.nodes.len() <= max_nodes,
        "{} nodes exceed the ceiling of {max_nodes}",
        graph.nodes.len()
    );
    assert!(
        graph.max_depth() <= max_depth,
        "depth {} exceeds the ceiling of {max_depth}",
        graph.max_depth()
    );
}
