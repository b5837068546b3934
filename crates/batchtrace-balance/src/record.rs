//! Per-node input/output/variance figures.

use serde::{Deserialize, Serialize};

use batchtrace_core::error::{Error, Result};
use batchtrace_core::units::{convert, Amount, Unit};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassBalanceRecord {
    pub total_input: Amount,
    pub total_output: Amount,
    /// `total_input - total_output`, exact.
    pub variance: Amount,
    /// `variance / total_input × 100`; absent when nothing was consumed.
    pub variance_percent: Option<f64>,
    pub unit: Unit,
}

impl MassBalanceRecord {
    pub fn new(total_input: Amount, total_output: Amount, unit: Unit) -> Result<Self> {
        let variance = total_input
            .checked_sub(total_output)
            .ok_or(Error::Overflow("computing variance"))?;
        Ok(Self {
            total_input,
            total_output,
            variance,
            variance_percent: variance.percent_of(total_input),
            unit,
        })
    }

    /// Same figures expressed in another unit of the same dimension.
    ///
    /// Amounts are rounded to nine fractional digits independently, so the
    /// converted variance may differ from the difference of the converted
    /// totals in the last digit. The percentage is carried over unchanged.
    pub fn in_unit(&self, unit: &Unit) -> Result<Self> {
        Ok(Self {
            total_input: convert(self.total_input, &self.unit, unit)?,
            total_output: convert(self.total_output, &self.unit, unit)?,
            variance: convert(self.variance, &self.unit, unit)?,
            variance_percent: self.variance_percent,
            unit: unit.clone(),
        })
    }

    pub fn is_balanced(&self) -> bool {
        self.variance.is_zero()
    }
}
