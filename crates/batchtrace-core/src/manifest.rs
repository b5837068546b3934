//! Per-trace manifest for audit.
//!
//! Every trace emits a manifest: who asked for what, when it started and
//! finished, and a fingerprint of the node and link sets. Two traces over
//! unchanged edge data carry the same fingerprint.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::Hash256;
use crate::id::TenantId;
use crate::model::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceManifest {
    pub id: ManifestId,

    pub tenant_id: TenantId,

    /// Root batch code as requested.
    pub root_code: String,

    pub direction: Direction,

    /// Stable hash of the node and link sets.
    pub fingerprint: Hash256,

    /// Engine version string for provenance.
    pub engine_version: String,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl TraceManifest {
    pub fn new(tenant_id: TenantId, root_code: &str, direction: Direction, started_ms: u64) -> Self {
        Self {
            id: ManifestId(Uuid::new_v4()),
            tenant_id,
            root_code: root_code.to_string(),
            direction,
            fingerprint: Hash256([0u8; 32]),
            engine_version: crate::VERSION.to_string(),
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn finish(mut self, finished_ms: u64, fingerprint: Hash256) -> Self {
        self.finished_ms = finished_ms;
        self.fingerprint = fingerprint;
        self
    }
}
