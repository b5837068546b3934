use thiserror::Error;

use batchtrace_core::id::TenantId;
use batchtrace_lineage::LineageError;

pub type Result<T> = std::result::Result<T, TraceError>;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("batch '{code}' not found in tenant {tenant}")]
    NotFound { tenant: TenantId, code: String },

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("edge store: {0}")]
    Store(String),

    #[error("trace cancelled")]
    Cancelled,

    #[error("trace deadline exceeded")]
    DeadlineExceeded,

    #[error("internal: {0}")]
    Internal(String),
}

impl From<LineageError> for TraceError {
    fn from(e: LineageError) -> Self {
        match e {
            LineageError::NotFound { tenant, code } => TraceError::NotFound { tenant, code },
            LineageError::InvalidLimits(msg) => TraceError::Validation(msg),
            LineageError::Store(e) => TraceError::Store(e.to_string()),
            LineageError::Cancelled => TraceError::Cancelled,
            LineageError::DeadlineExceeded => TraceError::DeadlineExceeded,
        }
    }
}

impl From<batchtrace_core::error::Error> for TraceError {
    fn from(e: batchtrace_core::error::Error) -> Self {
        TraceError::Validation(e.to_string())
    }
}
