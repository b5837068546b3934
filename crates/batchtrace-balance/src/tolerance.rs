//! Caller-supplied variance tolerance.

use serde::{Deserialize, Serialize};

use crate::record::MassBalanceRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToleranceVerdict {
    Within,
    Exceeds,
}

/// Largest acceptable `|variance_percent|`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarianceTolerance {
    pub max_abs_percent: f64,
}

impl VarianceTolerance {
    pub fn new(max_abs_percent: f64) -> Self {
        Self { max_abs_percent }
    }

    /// A record with no percentage (nothing consumed) is within tolerance
    /// only when it is exactly balanced.
    pub fn classify(&self, record: &MassBalanceRecord) -> ToleranceVerdict {
        let within = match record.variance_percent {
            Some(pct) => pct.abs() <= self.max_abs_percent,
            None => record.variance.is_zero(),
        };
        if within {
            ToleranceVerdict::Within
        } else {
            ToleranceVerdict::Exceeds
        }
    }
}
