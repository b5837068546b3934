//! In-memory edge store.
//!
//! Data is partitioned by tenant at the top level, so a lookup for one tenant
//! cannot even see another tenant's rows. Each partition keeps a lower-cased
//! code index and adjacency indexes by input and by output batch.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use batchtrace_core::id::{BatchId, RelationId, TenantId};
use batchtrace_core::model::{normalize_code, Batch, BatchRelation, EdgeScope};

use crate::error::{Result, StoreError};
use crate::snapshot::SnapshotRecord;
use crate::store::EdgeStore;

#[derive(Default)]
struct Partition {
    batches: HashMap<BatchId, Batch>,
    by_code: HashMap<String, BatchId>,
    relations: HashMap<RelationId, BatchRelation>,
    by_input: HashMap<BatchId, Vec<RelationId>>,
    by_output: HashMap<BatchId, Vec<RelationId>>,
}

/// Thread-safe in-memory store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryEdgeStore {
    tenants: Arc<RwLock<HashMap<TenantId, Partition>>>,
}

impl MemoryEdgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from snapshot records, in order.
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = SnapshotRecord>,
    {
        let store = Self::new();
        for record in records {
            match record {
                SnapshotRecord::Batch(batch) => store.insert_batch(batch)?,
                SnapshotRecord::Relation {
                    tenant_id,
                    relation,
                } => store.insert_relation(tenant_id, relation),
            }
        }
        Ok(store)
    }

    /// Add a batch to its tenant's partition. Codes are unique per tenant.
    pub fn insert_batch(&self, batch: Batch) -> Result<()> {
        let mut tenants = self.tenants.write();
        let part = tenants.entry(batch.tenant_id).or_default();
        if part.batches.contains_key(&batch.id) {
            return Err(StoreError::DuplicateBatch(batch.id));
        }
        let key = normalize_code(&batch.code);
        if part.by_code.contains_key(&key) {
            return Err(StoreError::DuplicateCode {
                tenant: batch.tenant_id,
                code: batch.code,
            });
        }
        part.by_code.insert(key, batch.id);
        part.batches.insert(batch.id, batch);
        Ok(())
    }

    /// Record a relation under `tenant`.
    ///
    /// Referential checks are the writer's job; this adapter stores what it
    /// is given so read-side defenses can be exercised.
    pub fn insert_relation(&self, tenant: TenantId, relation: BatchRelation) {
        let mut tenants = self.tenants.write();
        let part = tenants.entry(tenant).or_default();
        part.by_input
            .entry(relation.input_batch_id)
            .or_default()
            .push(relation.id);
        part.by_output
            .entry(relation.output_batch_id)
            .or_default()
            .push(relation.id);
        part.relations.insert(relation.id, relation);
    }

    /// Every record in a stable order (batches by id, then relations by id).
    pub fn records(&self) -> Vec<SnapshotRecord> {
        let tenants = self.tenants.read();
        let mut tenant_ids: Vec<&TenantId> = tenants.keys().collect();
        tenant_ids.sort();

        let mut out = Vec::new();
        for tenant in &tenant_ids {
            let part = &tenants[*tenant];
            let mut batches: Vec<&Batch> = part.batches.values().collect();
            batches.sort_by_key(|b| b.id);
            out.extend(batches.into_iter().cloned().map(SnapshotRecord::Batch));
        }
        for tenant in tenant_ids {
            let part = &tenants[tenant];
            let mut relations: Vec<&BatchRelation> = part.relations.values().collect();
            relations.sort_by_key(|r| r.id);
            out.extend(relations.into_iter().map(|r| SnapshotRecord::Relation {
                tenant_id: *tenant,
                relation: r.clone(),
            }));
        }
        out
    }

    pub fn batch_count(&self) -> usize {
        self.tenants.read().values().map(|p| p.batches.len()).sum()
    }

    pub fn relation_count(&self) -> usize {
        self.tenants.read().values().map(|p| p.relations.len()).sum()
    }
}

impl EdgeStore for MemoryEdgeStore {
    fn get_batch_by_code(&self, tenant: TenantId, code: &str) -> Result<Option<Batch>> {
        let tenants = self.tenants.read();
        let Some(part) = tenants.get(&tenant) else {
            return Ok(None);
        };
        Ok(part
            .by_code
            .get(&normalize_code(code))
            .and_then(|id| part.batches.get(id))
            .cloned())
    }

    fn get_batches_by_ids(&self, tenant: TenantId, ids: &[BatchId]) -> Result<Vec<Batch>> {
        let tenants = self.tenants.read();
        let Some(part) = tenants.get(&tenant) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| part.batches.get(id))
            .cloned()
            .collect())
    }

    fn get_relations_for_batches_at_level(
        &self,
        tenant: TenantId,
        ids: &[BatchId],
        scope: EdgeScope,
    ) -> Result<Vec<BatchRelation>> {
        let tenants = self.tenants.read();
        let Some(part) = tenants.get(&tenant) else {
            return Ok(Vec::new());
        };

        let mut seen: HashSet<RelationId> = HashSet::new();
        let mut out = Vec::new();
        let mut collect = |index: &HashMap<BatchId, Vec<RelationId>>| {
            for id in ids {
                for rid in index.get(id).into_iter().flatten() {
                    if seen.insert(*rid) {
                        if let Some(rel) = part.relations.get(rid) {
                            out.push(rel.clone());
                        }
                    }
                }
            }
        };
        if scope.includes_outbound() {
            collect(&part.by_input);
        }
        if scope.includes_inbound() {
            collect(&part.by_output);
        }
        Ok(out)
    }
}
