//! Exact quantities and the closed unit table.
//!
//! `Amount` is a fixed-point decimal with nine fractional digits backed by an
//! `i128`, so sums and differences are exact and a mass balance never drifts.
//! Units form a closed enum; every known unit maps to the base unit of its
//! dimension through an exact rational factor:
//!
//! | unit  | base | factor        |
//! |-------|------|---------------|
//! | mg    | g    | 1/1000        |
//! | g     | g    | 1             |
//! | kg    | g    | 1000          |
//! | t     | g    | 1 000 000     |
//! | lb    | g    | 453.59237     |
//! | oz    | g    | 28.349523125  |
//! | ml    | ml   | 1             |
//! | cl    | ml   | 10            |
//! | l     | ml   | 1000          |
//! | each  | each | 1             |
//! | dozen | each | 12            |
//!
//! Labels outside the table become `Unit::Other`, a dimension of their own:
//! two identical labels combine, anything else is a `UnitMismatch`.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Number of fractional decimal digits carried by `Amount`.
pub const SCALE_DIGITS: u32 = 9;
const SCALE: i128 = 1_000_000_000;

/// Fixed-point decimal amount (nine fractional digits).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Build from the raw scaled representation (units × 10⁹).
    pub const fn from_raw(raw: i128) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i128 {
        self.0
    }

    pub const fn from_units(units: i64) -> Self {
        Self(units as i128 * SCALE)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Multiply by `num / den`, rounding half away from zero at the last digit.
    pub fn mul_ratio(self, num: i128, den: i128) -> Option<Amount> {
        if den == 0 {
            return None;
        }
        let p = self.0.checked_mul(num)?;
        let q = p / den;
        let r = p % den;
        let bump = if r.unsigned_abs() * 2 >= den.unsigned_abs() {
            p.signum() * den.signum()
        } else {
            0
        };
        q.checked_add(bump).map(Amount)
    }

    /// `self / total × 100`, defined only for a positive `total`.
    pub fn percent_of(self, total: Amount) -> Option<f64> {
        if total.0 <= 0 {
            return None;
        }
        Some(self.0 as f64 / total.0 as f64 * 100.0)
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidAmount {
            input: s.to_string(),
            reason,
        };

        let input = s.trim();
        let (negative, digits) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input.strip_prefix('+').unwrap_or(input)),
        };
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid("no digits"));
        }
        let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(invalid("expected a plain decimal number"));
        }
        if frac_part.len() > SCALE_DIGITS as usize {
            return Err(invalid("more than nine fractional digits"));
        }

        let mut raw: i128 = 0;
        for b in int_part.bytes() {
            raw = raw
                .checked_mul(10)
                .and_then(|v| v.checked_add(i128::from(b - b'0')))
                .ok_or_else(|| invalid("out of range"))?;
        }
        raw = raw.checked_mul(SCALE).ok_or_else(|| invalid("out of range"))?;

        let mut frac: i128 = 0;
        for b in frac_part.bytes() {
            frac = frac * 10 + i128::from(b - b'0');
        }
        frac *= 10i128.pow(SCALE_DIGITS - frac_part.len() as u32);
        raw = raw.checked_add(frac).ok_or_else(|| invalid("out of range"))?;

        Ok(Amount(if negative { -raw } else { raw }))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let int = abs / SCALE as u128;
        let frac = abs % SCALE as u128;
        if frac == 0 {
            write!(f, "{sign}{int}")
        } else {
            let digits = format!("{:09}", frac);
            write!(f, "{sign}{int}.{}", digits.trim_end_matches('0'))
        }
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct AmountVisitor;

        impl<'de> Visitor<'de> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal amount as a string or number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Amount, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Amount, E> {
                Ok(Amount::from_units(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Amount, E> {
                i128::from(v)
                    .checked_mul(SCALE)
                    .map(Amount)
                    .ok_or_else(|| E::custom("amount out of range"))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Amount, E> {
                if !v.is_finite() {
                    return Err(E::custom("amount must be finite"));
                }
                format!("{:.9}", v).parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

/// Physical dimension a unit measures.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dimension {
    Mass,
    Volume,
    Count,
    /// A unit label outside the table; only combines with itself.
    Other(String),
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Mass => f.write_str("mass"),
            Dimension::Volume => f.write_str("volume"),
            Dimension::Count => f.write_str("count"),
            Dimension::Other(label) => write!(f, "'{label}'"),
        }
    }
}

/// Closed set of units with known conversions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Unit {
    Milligram,
    Gram,
    Kilogram,
    Tonne,
    Pound,
    Ounce,
    Millilitre,
    Centilitre,
    Litre,
    Each,
    Dozen,
    Other(String),
}

impl Unit {
    pub fn symbol(&self) -> &str {
        match self {
            Unit::Milligram => "mg",
            Unit::Gram => "g",
            Unit::Kilogram => "kg",
            Unit::Tonne => "t",
            Unit::Pound => "lb",
            Unit::Ounce => "oz",
            Unit::Millilitre => "ml",
            Unit::Centilitre => "cl",
            Unit::Litre => "l",
            Unit::Each => "each",
            Unit::Dozen => "dozen",
            Unit::Other(label) => label,
        }
    }

    pub fn dimension(&self) -> Dimension {
        match self {
            Unit::Milligram
            | Unit::Gram
            | Unit::Kilogram
            | Unit::Tonne
            | Unit::Pound
            | Unit::Ounce => Dimension::Mass,
            Unit::Millilitre | Unit::Centilitre | Unit::Litre => Dimension::Volume,
            Unit::Each | Unit::Dozen => Dimension::Count,
            Unit::Other(label) => Dimension::Other(label.clone()),
        }
    }

    /// Base unit of this unit's dimension.
    pub fn base(&self) -> Unit {
        match self.dimension() {
            Dimension::Mass => Unit::Gram,
            Dimension::Volume => Unit::Millilitre,
            Dimension::Count => Unit::Each,
            Dimension::Other(label) => Unit::Other(label),
        }
    }

    /// Exact factor to the base unit as `(numerator, denominator)`.
    fn factor(&self) -> (i128, i128) {
        match self {
            Unit::Milligram => (1, 1_000),
            Unit::Gram => (1, 1),
            Unit::Kilogram => (1_000, 1),
            Unit::Tonne => (1_000_000, 1),
            Unit::Pound => (45_359_237, 100_000),
            Unit::Ounce => (28_349_523_125, 1_000_000_000),
            Unit::Millilitre => (1, 1),
            Unit::Centilitre => (10, 1),
            Unit::Litre => (1_000, 1),
            Unit::Each => (1, 1),
            Unit::Dozen => (12, 1),
            Unit::Other(_) => (1, 1),
        }
    }

    /// Relative size used to pick a display unit (larger is coarser).
    pub fn magnitude(&self) -> f64 {
        let (n, d) = self.factor();
        n as f64 / d as f64
    }

    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.dimension() == other.dimension()
    }
}

/// Convert `amount` from one unit to another of the same dimension.
pub fn convert(amount: Amount, from: &Unit, to: &Unit) -> Result<Amount> {
    if !from.is_compatible(to) {
        return Err(Error::UnitMismatch {
            left: from.clone(),
            right: to.clone(),
        });
    }
    if from == to {
        return Ok(amount);
    }
    let (fnum, fden) = from.factor();
    let (tnum, tden) = to.factor();
    amount
        .mul_ratio(fnum * tden, fden * tnum)
        .ok_or(Error::Overflow("converting units"))
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let label = s.trim().to_lowercase();
        let unit = match label.as_str() {
            "" => return Err(Error::InvalidUnit(s.to_string())),
            "mg" | "milligram" | "milligrams" => Unit::Milligram,
            "g" | "gram" | "grams" | "gr" => Unit::Gram,
            "kg" | "kgs" | "kilo" | "kilos" | "kilogram" | "kilograms" => Unit::Kilogram,
            "t" | "tonne" | "tonnes" => Unit::Tonne,
            "lb" | "lbs" | "pound" | "pounds" => Unit::Pound,
            "oz" | "ounce" | "ounces" => Unit::Ounce,
            "ml" | "millilitre" | "millilitres" | "milliliter" | "milliliters" => Unit::Millilitre,
            "cl" | "centilitre" | "centilitres" | "centiliter" | "centiliters" => Unit::Centilitre,
            "l" | "ltr" | "litre" | "litres" | "liter" | "liters" => Unit::Litre,
            "each" | "ea" | "unit" | "units" | "pc" | "pcs" | "piece" | "pieces" | "count" => {
                Unit::Each
            }
            "dozen" | "doz" => Unit::Dozen,
            _ => Unit::Other(label),
        };
        Ok(unit)
    }
}

impl Serialize for Unit {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// An amount tagged with its unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity {
    pub amount: Amount,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(amount: Amount, unit: Unit) -> Self {
        Self { amount, unit }
    }

    pub fn convert_to(&self, unit: &Unit) -> Result<Quantity> {
        Ok(Quantity {
            amount: convert(self.amount, &self.unit, unit)?,
            unit: unit.clone(),
        })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.unit)
    }
}
