use thiserror::Error;

use batchtrace_core::id::TenantId;
use batchtrace_store::StoreError;

/// Result type local to batchtrace-lineage.
pub type Result<T> = std::result::Result<T, LineageError>;

#[derive(Debug, Error)]
pub enum LineageError {
    #[error("batch '{code}' not found in tenant {tenant}")]
    NotFound { tenant: TenantId, code: String },

    #[error("invalid traversal limits: {0}")]
    InvalidLimits(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("trace cancelled")]
    Cancelled,

    #[error("trace deadline exceeded")]
    DeadlineExceeded,
}
