//! Trace engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Depth bound (in hops from the root) when a request does not name one.
    pub default_max_depth: u32,

    /// Node-count bound when a request does not name one.
    pub default_max_nodes: usize,

    /// Requests asking for more depth than this are rejected.
    pub max_depth_ceiling: u32,

    /// Requests asking for more nodes than this are rejected.
    pub max_nodes_ceiling: usize,

    /// Optional per-trace deadline applied when the caller gives none.
    pub default_timeout_ms: Option<u64>,

    /// Optional variance tolerance (absolute percent) used to classify
    /// mass-balance records. No tolerance means no classification.
    pub variance_tolerance_pct: Option<f64>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            default_max_depth: 16,
            default_max_nodes: 5_000,
            max_depth_ceiling: 256,
            max_nodes_ceiling: 100_000,
            default_timeout_ms: None,
            variance_tolerance_pct: None,
        }
    }
}

impl TraceConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `BATCHTRACE_MAX_DEPTH`: default depth bound
    /// - `BATCHTRACE_MAX_NODES`: default node bound
    /// - `BATCHTRACE_MAX_DEPTH_CEILING`: largest depth a request may ask for
    /// - `BATCHTRACE_MAX_NODES_CEILING`: largest node bound a request may ask for
    /// - `BATCHTRACE_TIMEOUT_MS`: default per-trace deadline
    /// - `BATCHTRACE_VARIANCE_TOLERANCE_PCT`: variance tolerance in percent
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("BATCHTRACE_MAX_DEPTH") {
            if let Ok(v) = s.parse::<u32>() {
                cfg.default_max_depth = v;
            }
        }

        if let Ok(s) = std::env::var("BATCHTRACE_MAX_NODES") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.default_max_nodes = v;
            }
        }

        if let Ok(s) = std::env::var("BATCHTRACE_MAX_DEPTH_CEILING") {
            if let Ok(v) = s.parse::<u32>() {
                cfg.max_depth_ceiling = v;
            }
        }

        if let Ok(s) = std::env::var("BATCHTRACE_MAX_NODES_CEILING") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_nodes_ceiling = v;
            }
        }

        if let Ok(s) = std::env::var("BATCHTRACE_TIMEOUT_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.default_timeout_ms = Some(v);
            }
        }

        if let Ok(s) = std::env::var("BATCHTRACE_VARIANCE_TOLERANCE_PCT") {
            if let Ok(v) = s.parse::<f64>() {
                cfg.variance_tolerance_pct = Some(v);
            }
        }

        cfg
    }

    /// Reject configurations that could never serve a request.
    pub fn validate(&self) -> Result<()> {
        if self.default_max_depth == 0 || self.default_max_nodes == 0 {
            return Err(Error::Config("default bounds must be positive".into()));
        }
        if self.default_max_depth > self.max_depth_ceiling {
            return Err(Error::Config(format!(
                "default_max_depth {} exceeds max_depth_ceiling {}",
                self.default_max_depth, self.max_depth_ceiling
            )));
        }
        if self.default_max_nodes > self.max_nodes_ceiling {
            return Err(Error::Config(format!(
                "default_max_nodes {} exceeds max_nodes_ceiling {}",
                self.default_max_nodes, self.max_nodes_ceiling
            )));
        }
        if let Some(tol) = self.variance_tolerance_pct {
            if !tol.is_finite() || tol < 0.0 {
                return Err(Error::Config(format!(
                    "variance_tolerance_pct must be a non-negative number, got {tol}"
                )));
            }
        }
        Ok(())
    }
}
