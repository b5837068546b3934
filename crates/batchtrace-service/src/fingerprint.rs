//! Stable trace fingerprints.
//!
//! The digest covers the direction, the root, the ordered node set (batch,
//! depth, cycle mark) and the ordered link set. Traversal order is
//! deterministic, so two traces over unchanged data hash identically and any
//! change to the reachable graph changes the digest.

use batchtrace_core::hash::{Fingerprint, Hash256};
use batchtrace_lineage::LineageGraph;

use crate::error::{Result, TraceError};

const DOMAIN: &str = "batchtrace/trace/v1";

pub fn fingerprint_graph(graph: &LineageGraph) -> Result<Hash256> {
    let hash = |e: batchtrace_core::error::Error| TraceError::Internal(format!("hashing: {e}"));
    let mut fp = Fingerprint::new(DOMAIN);
    fp.push(&graph.direction).map_err(hash)?;
    fp.push(&graph.root).map_err(hash)?;
    fp.push(&graph.nodes.len()).map_err(hash)?;
    for node in &graph.nodes {
        fp.push(node).map_err(hash)?;
    }
    fp.push(&graph.links.len()).map_err(hash)?;
    for link in &graph.links {
        fp.push(link).map_err(hash)?;
    }
    Ok(fp.finish())
}
