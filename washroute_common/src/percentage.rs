use std::fmt::Display;

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

const MAX_BASIS_POINTS: i64 = 10_000;

/// A fee percentage, stored as basis points (1/100th of a percent) so that fee maths stays in integers.
///
/// Values are validated on construction: negative, non-finite and above-100% values are rejected here, so anything
/// downstream can trust a `Percentage` it is handed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(try_from = "i64", into = "i64")]
pub struct Percentage(i64);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PercentageError {
    #[error("Percentage must be a finite number, got {0}")]
    NotFinite(f64),
    #[error("Percentage cannot be negative, got {0}")]
    Negative(f64),
    #[error("Percentage cannot exceed 100%, got {0}")]
    TooLarge(f64),
}

impl Percentage {
    pub fn from_percent(pct: f64) -> Result<Self, PercentageError> {
        if !pct.is_finite() {
            return Err(PercentageError::NotFinite(pct));
        }
        if pct < 0.0 {
            return Err(PercentageError::Negative(pct));
        }
        if pct > 100.0 {
            return Err(PercentageError::TooLarge(pct));
        }
        #[allow(clippy::cast_possible_truncation)]
        let bps = (pct * 100.0).round() as i64;
        Ok(Self(bps))
    }

    pub fn from_basis_points(bps: i64) -> Result<Self, PercentageError> {
        #[allow(clippy::cast_precision_loss)]
        let pct = bps as f64 / 100.0;
        if bps < 0 {
            return Err(PercentageError::Negative(pct));
        }
        if bps > MAX_BASIS_POINTS {
            return Err(PercentageError::TooLarge(pct));
        }
        Ok(Self(bps))
    }

    pub fn basis_points(&self) -> i64 {
        self.0
    }

    pub fn as_percent(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl TryFrom<i64> for Percentage {
    type Error = PercentageError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_basis_points(value)
    }
}

impl From<Percentage> for i64 {
    fn from(value: Percentage) -> Self {
        value.0
    }
}

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_bad_values() {
        assert!(Percentage::from_percent(f64::NAN).unwrap_err().to_string().contains("finite"));
        assert!(matches!(Percentage::from_percent(f64::INFINITY), Err(PercentageError::NotFinite(_))));
        assert!(matches!(Percentage::from_percent(-0.5), Err(PercentageError::Negative(_))));
        assert!(matches!(Percentage::from_percent(100.01), Err(PercentageError::TooLarge(_))));
        assert!(matches!(Percentage::from_basis_points(-1), Err(PercentageError::Negative(_))));
    }

    #[test]
    fn converts_percent_to_basis_points() {
        assert_eq!(Percentage::from_percent(9.0).unwrap().basis_points(), 900);
        assert_eq!(Percentage::from_percent(12.5).unwrap().basis_points(), 1250);
        assert_eq!(Percentage::from_percent(12.5).unwrap().to_string(), "12.50%");
        assert_eq!(Percentage::from_percent(0.0).unwrap(), Percentage::default());
    }
}
