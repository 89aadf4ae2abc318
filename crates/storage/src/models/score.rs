use serde::{Deserialize, Serialize};

use crate::scoring::ScoringError;

fn check_unit_interval(value: f64) -> Result<f64, ScoringError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ScoringError::ScoreOutOfRange { score: value })
    }
}

/// A role's share of the credit for one review topic, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Contribution(f64);

impl Contribution {
    pub fn new(value: f64) -> Result<Self, ScoringError> {
        check_unit_interval(value).map(Self)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Reviewer agreement for one review topic: 1 is full agreement.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Consensuality(f64);

impl Consensuality {
    pub const FULL: Self = Self(1.0);

    pub fn new(value: f64) -> Result<Self, ScoringError> {
        check_unit_interval(value).map(Self)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Contribution {
    type Error = ScoringError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Contribution> for f64 {
    fn from(value: Contribution) -> Self {
        value.0
    }
}

impl TryFrom<f64> for Consensuality {
    type Error = ScoringError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Consensuality> for f64 {
    fn from(value: Consensuality) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_is_enforced() {
        assert!(Contribution::new(0.0).is_ok());
        assert!(Contribution::new(1.0).is_ok());
        assert!(Contribution::new(1.01).is_err());
        assert!(Contribution::new(-0.01).is_err());
        assert!(Consensuality::new(f64::NAN).is_err());
        assert!(Consensuality::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_deserialization_validates() {
        let ok: Contribution = serde_json::from_str("0.25").unwrap();
        assert_eq!(ok.value(), 0.25);

        let bad: Result<Consensuality, _> = serde_json::from_str("1.5");
        assert!(bad.is_err());
    }
}
