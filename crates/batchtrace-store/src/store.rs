//! The read interface the trace engine consumes.

use std::sync::Arc;

use batchtrace_core::id::{BatchId, TenantId};
use batchtrace_core::model::{Batch, BatchRelation, EdgeScope};

use crate::error::Result;

/// Read-only, tenant-scoped access to batches and their relations.
///
/// Every method takes the tenant explicitly; implementations must never
/// return a record owned by another tenant. Implementations are expected to
/// answer `get_relations_for_batches_at_level` with a single batched lookup
/// (one IN-list query), not one query per id.
pub trait EdgeStore: Send + Sync {
    /// Exact, case-insensitive code lookup within `tenant`.
    fn get_batch_by_code(&self, tenant: TenantId, code: &str) -> Result<Option<Batch>>;

    /// Batched snapshot lookup. Unknown ids are simply absent from the result.
    fn get_batches_by_ids(&self, tenant: TenantId, ids: &[BatchId]) -> Result<Vec<Batch>>;

    /// All relations touching `ids` on the requested side(s), each at most once.
    fn get_relations_for_batches_at_level(
        &self,
        tenant: TenantId,
        ids: &[BatchId],
        scope: EdgeScope,
    ) -> Result<Vec<BatchRelation>>;
}

impl<S: EdgeStore + ?Sized> EdgeStore for &S {
    fn get_batch_by_code(&self, tenant: TenantId, code: &str) -> Result<Option<Batch>> {
        (**self).get_batch_by_code(tenant, code)
    }

    fn get_batches_by_ids(&self, tenant: TenantId, ids: &[BatchId]) -> Result<Vec<Batch>> {
        (**self).get_batches_by_ids(tenant, ids)
    }

    fn get_relations_for_batches_at_level(
        &self,
        tenant: TenantId,
        ids: &[BatchId],
        scope: EdgeScope,
    ) -> Result<Vec<BatchRelation>> {
        (**self).get_relations_for_batches_at_level(tenant, ids, scope)
    }
}

impl<S: EdgeStore + ?Sized> EdgeStore for Arc<S> {
    fn get_batch_by_code(&self, tenant: TenantId, code: &str) -> Result<Option<Batch>> {
        (**self).get_batch_by_code(tenant, code)
    }

    fn get_batches_by_ids(&self, tenant: TenantId, ids: &[BatchId]) -> Result<Vec<Batch>> {
        (**self).get_batches_by_ids(tenant, ids)
    }

    fn get_relations_for_batches_at_level(
        &self,
        tenant: TenantId,
        ids: &[BatchId],
        scope: EdgeScope,
    ) -> Result<Vec<BatchRelation>> {
        (**self).get_relations_for_batches_at_level(tenant, ids, scope)
    }
}

impl<S: EdgeStore + ?Sized> EdgeStore for Box<S> {
    fn get_batch_by_code(&self, tenant: TenantId, code: &str) -> Result<Option<Batch>> {
        (**self).get_batch_by_code(tenant, code)
    }

    fn get_batches_by_ids(&self, tenant: TenantId, ids: &[BatchId]) -> Result<Vec<Batch>> {
        (**self).get_batches_by_ids(tenant, ids)
    }

    fn get_relations_for_batches_at_level(
        &self,
        tenant: TenantId,
        ids: &[BatchId],
        scope: EdgeScope,
    ) -> Result<Vec<BatchRelation>> {
        (**self).get_relations_for_batches_at_level(tenant, ids, scope)
    }
}
