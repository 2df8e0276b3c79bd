//! Prediction Result

use data_validator::{Score, ScoreTriple};
use serde::{Deserialize, Serialize};

/// Which predictor produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "statistical")]
    Statistical,
    #[serde(rename = "rule-based")]
    RuleBased,
}

impl Method {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Statistical => "statistical",
            Method::RuleBased => "rule-based",
        }
    }
}

/// Final, bounded assessment of one anomaly.
///
/// `criticality` is always the sum of the three components. Fields are
/// private so that holds for every value in circulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PredictionResult {
    reliability: Score,
    availability: Score,
    process_safety: Score,
    criticality: u8,
    method: Method,
}

impl PredictionResult {
    pub fn new(scores: ScoreTriple, method: Method) -> Self {
        Self {
            reliability: scores.reliability,
            availability: scores.availability,
            process_safety: scores.process_safety,
            criticality: scores.criticality(),
            method,
        }
    }

    pub fn reliability(&self) -> Score {
        self.reliability
    }

    pub fn availability(&self) -> Score {
        self.availability
    }

    pub fn process_safety(&self) -> Score {
        self.process_safety
    }

    pub fn criticality(&self) -> u8 {
        self.criticality
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn scores(&self) -> ScoreTriple {
        ScoreTriple::new(self.reliability, self.availability, self.process_safety)
    }
}
