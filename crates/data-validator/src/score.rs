//! Bounded Severity Scores

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single severity score, always within `[Score::MIN, Score::MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Validate an exact score value
    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::OutOfRange {
                field: "score",
                value: value as i64,
                min: Self::MIN as i64,
                max: Self::MAX as i64,
            })
        }
    }

    /// Clamp an arbitrary integer into range
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    /// Round to the nearest integer (half away from zero), then clamp.
    ///
    /// Returns `None` for NaN or infinite input.
    pub fn rounded(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let rounded = value.round().clamp(Self::MIN as f64, Self::MAX as f64);
        Some(Self(rounded as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Score {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unbounded per-metric output of a predictor, before reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawScores<T> {
    pub reliability: T,
    pub availability: T,
    pub process_safety: T,
}

impl<T> RawScores<T> {
    pub fn new(reliability: T, availability: T, process_safety: T) -> Self {
        Self {
            reliability,
            availability,
            process_safety,
        }
    }
}

/// The three bounded component scores of an assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreTriple {
    /// Reliability / integrity
    pub reliability: Score,
    /// Availability
    pub availability: Score,
    /// Process safety
    pub process_safety: Score,
}

impl ScoreTriple {
    pub fn new(reliability: Score, availability: Score, process_safety: Score) -> Self {
        Self {
            reliability,
            availability,
            process_safety,
        }
    }

    /// Clamp integer predictor output into range
    pub fn clamped(raw: RawScores<i64>) -> Self {
        Self {
            reliability: Score::clamped(raw.reliability),
            availability: Score::clamped(raw.availability),
            process_safety: Score::clamped(raw.process_safety),
        }
    }

    /// Round and clamp real-valued predictor output.
    ///
    /// Returns `None` if any component is not finite.
    pub fn rounded(raw: RawScores<f64>) -> Option<Self> {
        Some(Self {
            reliability: Score::rounded(raw.reliability)?,
            availability: Score::rounded(raw.availability)?,
            process_safety: Score::rounded(raw.process_safety)?,
        })
    }

    /// Composite criticality, the sum of the components (3..=15)
    pub fn criticality(&self) -> u8 {
        self.reliability.value() + self.availability.value() + self.process_safety.value()
    }
}
