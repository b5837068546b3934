//! Shared builders for integration tests.
#![allow(dead_code)]

use batchtrace_core::id::{BatchId, RelationId, SiteId, TenantId};
use batchtrace_core::model::{Batch, BatchKind, BatchRelation, BatchStatus};
use batchtrace_core::units::{Amount, Unit};
use batchtrace_store::MemoryEdgeStore;

pub const BAKERY: TenantId = TenantId::from_u128(0xBA4E);
pub const OTHER: TenantId = TenantId::from_u128(0x07E4);

pub const FLOUR: BatchId = BatchId::from_u128(1);
pub const DOUGH: BatchId = BatchId::from_u128(2);
pub const LOAF_1: BatchId = BatchId::from_u128(3);
pub const LOAF_2: BatchId = BatchId::from_u128(4);
pub const WATER: BatchId = BatchId::from_u128(5);

pub fn batch(tenant: TenantId, id: u128, code: &str, kind: BatchKind, unit: Unit) -> Batch {
    Batch {
        id: BatchId::from_u128(id),
        code: code.to_string(),
        kind,
        quantity_produced: Amount::from_units(1),
        unit,
        produced_at: id as u64,
        site_id: SiteId::from_u128(0x5173),
        tenant_id: tenant,
        status: BatchStatus::Active,
    }
}

pub fn relation(id: u128, input: u128, output: u128, qty: &str, unit: Unit) -> BatchRelation {
    BatchRelation {
        id: RelationId::from_u128(id),
        input_batch_id: BatchId::from_u128(input),
        output_batch_id: BatchId::from_u128(output),
        quantity_consumed: qty.parse().unwrap(),
        unit,
        recorded_at: 1_000 + id as u64,
    }
}

/// Flour and water into dough; dough into two loaves.
pub fn bakery_store() -> MemoryEdgeStore {
    let store = MemoryEdgeStore::new();
    for (id, code, kind) in [
        (1, "RM-FLOUR-001", BatchKind::RawMaterialLot),
        (2, "DOUGH-550", BatchKind::ProductionBatch),
        (3, "LOAF-9001", BatchKind::ProductionBatch),
        (4, "LOAF-9002", BatchKind::ProductionBatch),
        (5, "RM-WATER-007", BatchKind::RawMaterialLot),
    ] {
        store
            .insert_batch(batch(BAKERY, id, code, kind, Unit::Kilogram))
            .unwrap();
    }
    store.insert_relation(BAKERY, relation(100, 1, 2, "100", Unit::Kilogram));
    store.insert_relation(BAKERY, relation(101, 5, 2, "60", Unit::Kilogram));
    store.insert_relation(BAKERY, relation(102, 2, 3, "80", Unit::Kilogram));
    store.insert_relation(BAKERY, relation(103, 2, 4, "78", Unit::Kilogram));
    store
}

/// `len` batches chained `C-0 → C-1 → …` in one tenant.
pub fn chain_store(len: u128) -> MemoryEdgeStore {
    let store = MemoryEdgeStore::new();
    for i in 0..len {
        store
            .insert_batch(batch(
                BAKERY,
                i + 1,
                &format!("C-{i}"),
                BatchKind::ProductionBatch,
                Unit::Kilogram,
            ))
            .unwrap();
    }
    for i in 1..len {
        store.insert_relation(BAKERY, relation(10_000 + i, i, i + 1, "1", Unit::Kilogram));
    }
    store
}
