//! Trace requests and their validation against `TraceConfig`.

use std::time::Duration;

use batchtrace_core::config::TraceConfig;
use batchtrace_core::id::TenantId;
use batchtrace_core::model::Direction;
use batchtrace_lineage::{BuildLimits, CancelToken};

use crate::error::{Result, TraceError};

#[derive(Debug, Clone)]
pub struct TraceRequest {
    pub tenant_id: TenantId,
    pub batch_code: String,
    pub direction: Direction,
    /// Falls back to `TraceConfig::default_max_depth`.
    pub max_depth: Option<u32>,
    /// Falls back to `TraceConfig::default_max_nodes`.
    pub max_nodes: Option<usize>,
    /// Falls back to `TraceConfig::default_timeout_ms`.
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelToken>,
}

impl TraceRequest {
    pub fn new(tenant_id: TenantId, batch_code: impl Into<String>, direction: Direction) -> Self {
        Self {
            tenant_id,
            batch_code: batch_code.into(),
            direction,
            max_depth: None,
            max_nodes: None,
            timeout: None,
            cancel: None,
        }
    }

    /// Build a request from untyped input (CLI flags, query strings).
    pub fn parse(tenant_id: &str, batch_code: &str, direction: &str) -> Result<Self> {
        let tenant = tenant_id
            .parse::<TenantId>()
            .map_err(|e| TraceError::Validation(format!("tenant id '{tenant_id}': {e}")))?;
        let direction = direction.parse::<Direction>()?;
        Ok(Self::new(tenant, batch_code, direction))
    }

    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_max_nodes(mut self, nodes: usize) -> Self {
        self.max_nodes = Some(nodes);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Same request, other direction.
    pub fn reversed(&self) -> Self {
        Self {
            direction: self.direction.opposite(),
            ..self.clone()
        }
    }

    /// Trimmed code, effective limits and effective timeout.
    pub(crate) fn resolve(&self, cfg: &TraceConfig) -> Result<Resolved> {
        let code = self.batch_code.trim();
        if code.is_empty() {
            return Err(TraceError::Validation("batch code must not be empty".into()));
        }

        let max_depth = self.max_depth.unwrap_or(cfg.default_max_depth);
        if max_depth == 0 || max_depth > cfg.max_depth_ceiling {
            return Err(TraceError::Validation(format!(
                "max_depth must be between 1 and {}, got {max_depth}",
                cfg.max_depth_ceiling
            )));
        }

        let max_nodes = self.max_nodes.unwrap_or(cfg.default_max_nodes);
        if max_nodes == 0 || max_nodes > cfg.max_nodes_ceiling {
            return Err(TraceError::Validation(format!(
                "max_nodes must be between 1 and {}, got {max_nodes}",
                cfg.max_nodes_ceiling
            )));
        }

        let timeout = self
            .timeout
            .or(cfg.default_timeout_ms.map(Duration::from_millis));
        if timeout.is_some_and(|t| t.is_zero()) {
            return Err(TraceError::Validation("timeout must be positive".into()));
        }

        Ok(Resolved {
            code: code.to_string(),
            limits: BuildLimits::new(max_depth, max_nodes),
            timeout,
        })
    }
}

pub(crate) struct Resolved {
    pub code: String,
    pub limits: BuildLimits,
    pub timeout: Option<Duration>,
}
