use thiserror::Error;

use batchtrace_core::id::{BatchId, TenantId};

/// Result type local to batchtrace-store.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot line {line}: {reason}")]
    Snapshot { line: usize, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("batch code '{code}' already exists in tenant {tenant}")]
    DuplicateCode { tenant: TenantId, code: String },

    #[error("batch {0} already exists")]
    DuplicateBatch(BatchId),
}
