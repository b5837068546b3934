//! Metrics/tracing hooks.
//!
//! Kept dependency-light: events go through `tracing` when the feature is on
//! and vanish otherwise. Wire a subscriber up in the binary layer.

use crate::result::TraceStats;

#[cfg(feature = "tracing")]
pub fn emit_span(event: &str, key_values: &[(&str, String)]) {
    let span = tracing::span!(tracing::Level::TRACE, "batchtrace", event);
    let _entered = span.enter();
    for (k, v) in key_values {
        tracing::trace!(%event, %k, %v, "metric");
    }
}

#[cfg(not(feature = "tracing"))]
pub fn emit_span(_event: &str, _key_values: &[(&str, String)]) { /* no-op */
}

pub fn emit_trace_stats(stats: &TraceStats) {
    emit_span(
        "trace",
        &[
            ("levels_expanded", stats.levels_expanded.to_string()),
            ("round_trips", stats.round_trips.to_string()),
            ("max_frontier_size", stats.max_frontier_size.to_string()),
            ("nodes", stats.nodes.to_string()),
            ("links", stats.links.to_string()),
            ("elapsed_ms", stats.elapsed_ms.to_string()),
        ],
    );
}
