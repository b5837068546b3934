use thiserror::Error;

use crate::units::Unit;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid amount '{input}': {reason}")]
    InvalidAmount { input: String, reason: &'static str },

    #[error("Invalid unit: {0}")]
    InvalidUnit(String),

    #[error("Invalid direction '{0}': expected 'forward' or 'backward'")]
    InvalidDirection(String),

    #[error("Unit mismatch: no conversion between '{left}' and '{right}'")]
    UnitMismatch { left: Unit, right: Unit },

    #[error("Amount overflow while {0}")]
    Overflow(&'static str),

    #[error("Hashing error: {0}")]
    Hash(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}
