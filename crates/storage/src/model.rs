//! Persisted Records

use crate::StorageError;
use chrono::{DateTime, Utc};
use data_validator::{AnomalyInput, Score, ScoreTriple};
use scoring::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a stored anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnomalyId(pub Uuid);

impl AnomalyId {
    pub fn new() -> Self {
        AnomalyId(Uuid::new_v4())
    }
}

impl Default for AnomalyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnomalyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AnomalyId {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(AnomalyId)
            .map_err(|e| StorageError::SerializationError(format!("anomaly id '{}': {}", s, e)))
    }
}

/// Identifier of an import batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub Uuid);

impl BatchId {
    pub fn new() -> Self {
        BatchId(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BatchId {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(BatchId)
            .map_err(|e| StorageError::SerializationError(format!("batch id '{}': {}", s, e)))
    }
}

/// Import batch lifecycle: `pending → processing → {completed | failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl BatchStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Failed)
    }

    /// Whether the state machine allows moving to `next`.
    ///
    /// Re-asserting the current non-terminal state is allowed so progress
    /// counters can be updated.
    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        match self {
            BatchStatus::Pending => true,
            BatchStatus::Processing => next != BatchStatus::Pending,
            BatchStatus::Completed | BatchStatus::Failed => false,
        }
    }
}

impl FromStr for BatchStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BatchStatus::Pending),
            "processing" => Ok(BatchStatus::Processing),
            "completed" => Ok(BatchStatus::Completed),
            "failed" => Ok(BatchStatus::Failed),
            other => Err(StorageError::SerializationError(format!(
                "unknown batch status '{}'",
                other
            ))),
        }
    }
}

/// Grouping record for one bulk import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub id: BatchId,
    pub filename: String,
    pub total_records: usize,
    pub processed_records: usize,
    pub status: BatchStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Expert overrides, each metric independently nullable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanScores {
    pub reliability: Option<Score>,
    pub availability: Option<Score>,
    pub process_safety: Option<Score>,
}

impl HumanScores {
    /// Per metric, the human score when present, else the AI score
    pub fn resolve(&self, ai: &ScoreTriple) -> ScoreTriple {
        ScoreTriple {
            reliability: self.reliability.unwrap_or(ai.reliability),
            availability: self.availability.unwrap_or(ai.availability),
            process_safety: self.process_safety.unwrap_or(ai.process_safety),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.reliability.is_none() && self.availability.is_none() && self.process_safety.is_none()
    }
}

/// Anomaly as persisted: the submitted record, the permanent AI assessment,
/// and optional expert overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredAnomaly {
    pub id: AnomalyId,
    #[serde(flatten)]
    pub input: AnomalyInput,
    pub ai: ScoreTriple,
    pub ai_criticality: u8,
    pub method: Method,
    pub human: HumanScores,
    /// Workflow status, `nouvelle` on creation
    pub status: String,
    pub import_batch_id: Option<BatchId>,
    pub created_at: DateTime<Utc>,
}

impl StoredAnomaly {
    /// Initial workflow status of a new anomaly
    pub const INITIAL_STATUS: &'static str = "nouvelle";

    /// Final scores, derived on read and never stored
    pub fn final_scores(&self) -> ScoreTriple {
        self.human.resolve(&self.ai)
    }

    pub fn final_criticality(&self) -> u8 {
        self.final_scores().criticality()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(r: i64, a: i64, p: i64) -> ScoreTriple {
        ScoreTriple::new(Score::clamped(r), Score::clamped(a), Score::clamped(p))
    }

    fn anomaly(human: HumanScores) -> StoredAnomaly {
        StoredAnomaly {
            id: AnomalyId::new(),
            input: AnomalyInput::new("EQ001", "Hydraulic", "Pressure drop"),
            ai: triple(4, 5, 5),
            ai_criticality: 14,
            method: Method::RuleBased,
            human,
            status: StoredAnomaly::INITIAL_STATUS.to_string(),
            import_batch_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_final_equals_ai_without_review() {
        let stored = anomaly(HumanScores::default());
        assert_eq!(stored.final_scores(), stored.ai);
        assert_eq!(stored.final_criticality(), 14);
    }

    #[test]
    fn test_final_takes_human_per_metric() {
        let stored = anomaly(HumanScores {
            availability: Some(Score::clamped(2)),
            ..Default::default()
        });
        assert_eq!(stored.final_scores(), triple(4, 2, 5));
        assert_eq!(stored.final_criticality(), 11);
        assert_eq!(stored.ai, triple(4, 5, 5));
    }

    #[test]
    fn test_batch_status_transitions() {
        assert!(BatchStatus::Pending.can_transition_to(BatchStatus::Processing));
        assert!(BatchStatus::Pending.can_transition_to(BatchStatus::Failed));
        assert!(BatchStatus::Processing.can_transition_to(BatchStatus::Completed));
        assert!(BatchStatus::Processing.can_transition_to(BatchStatus::Processing));
        assert!(!BatchStatus::Processing.can_transition_to(BatchStatus::Pending));
        assert!(!BatchStatus::Completed.can_transition_to(BatchStatus::Failed));
        assert!(!BatchStatus::Failed.can_transition_to(BatchStatus::Completed));
    }

    #[test]
    fn test_status_round_trip_names() {
        for status in [
            BatchStatus::Pending,
            BatchStatus::Processing,
            BatchStatus::Completed,
            BatchStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<BatchStatus>().unwrap(), status);
        }
        assert!("archived".parse::<BatchStatus>().is_err());
    }

    #[test]
    fn test_stored_anomaly_serializes_flat_input() {
        let json = serde_json::to_value(anomaly(HumanScores::default())).unwrap();
        assert_eq!(json["equipment_id"], "EQ001");
        assert_eq!(json["method"], "rule-based");
        assert_eq!(json["ai"]["availability"], 5);
        assert!(json["human"]["reliability"].is_null());
    }
}
