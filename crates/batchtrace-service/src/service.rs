//! Trace Query Service.
//!
//! Validate → build lineage graph → mass balance → manifest. Every call is a
//! pure read through `&self`, so one service can serve any number of
//! concurrent traces.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use batchtrace_balance::{MassBalanceCalculator, VarianceTolerance};
use batchtrace_core::config::TraceConfig;
use batchtrace_core::manifest::TraceManifest;
use batchtrace_lineage::{Interrupt, LineageGraphBuilder};
use batchtrace_store::EdgeStore;

use crate::error::{Result, TraceError};
use crate::fingerprint::fingerprint_graph;
use crate::metrics::emit_trace_stats;
use crate::request::TraceRequest;
use crate::result::{balance_anomalies, BothDirections, TraceAnomaly, TraceResult, TraceStats};

pub struct TraceService<S> {
    cfg: TraceConfig,
    builder: LineageGraphBuilder<S>,
    calculator: MassBalanceCalculator,
}

impl<S: EdgeStore> TraceService<S> {
    pub fn new(store: S, cfg: TraceConfig) -> Result<Self> {
        cfg.validate()
            .map_err(|e| TraceError::Validation(format!("config: {e}")))?;
        let calculator = MassBalanceCalculator::new()
            .with_tolerance(cfg.variance_tolerance_pct.map(VarianceTolerance::new));
        Ok(Self {
            cfg,
            builder: LineageGraphBuilder::new(store),
            calculator,
        })
    }

    pub fn config(&self) -> &TraceConfig {
        &self.cfg
    }

    pub fn store(&self) -> &S {
        self.builder.store()
    }

    pub fn trace(&self, req: &TraceRequest) -> Result<TraceResult> {
        let resolved = req.resolve(&self.cfg)?;
        let started = Instant::now();
        let started_ms = now_millis();

        let mut interrupt = Interrupt::none();
        if let Some(token) = &req.cancel {
            interrupt = interrupt.with_cancel(token.clone());
        }
        if let Some(timeout) = resolved.timeout {
            interrupt = interrupt.with_deadline(started + timeout);
        }

        let graph = self
            .builder
            .build(
                req.tenant_id,
                &resolved.code,
                req.direction,
                resolved.limits,
                &interrupt,
            )
            .map_err(|e| {
                #[cfg(feature = "tracing")]
                tracing::debug!(tenant = %req.tenant_id, code = %resolved.code, error = %e, "trace failed");
                TraceError::from(e)
            })?;

        let mass_balance = self
            .calculator
            .compute(&graph.nodes, &graph.balance_lines, graph.root);

        let fingerprint = fingerprint_graph(&graph)?;
        let manifest = TraceManifest::new(req.tenant_id, &resolved.code, req.direction, started_ms)
            .finish(now_millis(), fingerprint);

        let stats = TraceStats {
            levels_expanded: graph.stats.levels_expanded,
            round_trips: graph.stats.round_trips,
            max_frontier_size: graph.stats.max_frontier_size,
            nodes: graph.nodes.len(),
            links: graph.links.len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        emit_trace_stats(&stats);

        let mut anomalies: Vec<TraceAnomaly> =
            graph.anomalies.into_iter().map(TraceAnomaly::from).collect();
        anomalies.extend(balance_anomalies(&mass_balance));

        #[cfg(feature = "tracing")]
        {
            tracing::info!(
                tenant = %req.tenant_id,
                code = %resolved.code,
                direction = %req.direction,
                nodes = stats.nodes,
                links = stats.links,
                round_trips = stats.round_trips,
                elapsed_ms = stats.elapsed_ms,
                fingerprint = %manifest.fingerprint,
                "trace complete"
            );
            if graph.truncated {
                tracing::warn!(code = %resolved.code, reason = ?graph.truncation, "trace truncated");
            }
            if !graph.cycle_flags.is_empty() {
                tracing::warn!(
                    code = %resolved.code,
                    cycles = graph.cycle_flags.len(),
                    "consumption cycle detected; affected branches stopped"
                );
            }
        }

        let Some(root) = graph.nodes.first() else {
            return Err(TraceError::Internal("lineage graph has no root node".into()));
        };
        let batch = root.batch.clone();

        Ok(TraceResult {
            direction: graph.direction,
            batch,
            nodes: graph.nodes,
            links: graph.links,
            mass_balance,
            truncated: graph.truncated,
            truncation: graph.truncation,
            cycle_flags: graph.cycle_flags,
            anomalies,
            stats,
            manifest,
        })
    }

    /// Trace the same root forward and backward concurrently.
    ///
    /// The direction of `req` is ignored. The two traces share nothing but
    /// the store; the first error (forward checked first) is returned.
    pub fn trace_both(&self, req: &TraceRequest) -> Result<BothDirections> {
        let forward_req = TraceRequest {
            direction: batchtrace_core::model::Direction::Forward,
            ..req.clone()
        };
        let backward_req = forward_req.reversed();

        let (forward, backward) = std::thread::scope(|scope| {
            let handle = scope.spawn(|| self.trace(&backward_req));
            let forward = self.trace(&forward_req);
            let backward = handle
                .join()
                .unwrap_or_else(|_| Err(TraceError::Internal("backward trace panicked".into())));
            (forward, backward)
        });

        Ok(BothDirections {
            forward: forward?,
            backward: backward?,
        })
    }
}

#[cfg(feature = "async")]
impl<S: EdgeStore + 'static> TraceService<S> {
    /// Run a trace on tokio's blocking pool.
    ///
    /// Wrap the future in `tokio::time::timeout` for a caller-side bound; pass
    /// a `CancelToken` in the request to stop the traversal itself.
    pub async fn trace_async(self: std::sync::Arc<Self>, req: TraceRequest) -> Result<TraceResult> {
        tokio::task::spawn_blocking(move || self.trace(&req))
            .await
            .map_err(|e| TraceError::Internal(format!("trace task failed: {e}")))?
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
