//! Per-Record Outcomes and Batch Result

use scoring::PredictionResult;
use serde::Serialize;
use storage::{AnomalyId, BatchId};

/// Number of failure reasons quoted in a batch error message
const MAX_SUMMARY_REASONS: usize = 5;

/// What happened to one input record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecordOutcome {
    Stored {
        index: usize,
        anomaly_id: AnomalyId,
        prediction: PredictionResult,
    },
    Failed {
        index: usize,
        prediction: PredictionResult,
        reason: String,
    },
}

impl RecordOutcome {
    /// Position of the record in the input sequence
    pub fn index(&self) -> usize {
        match self {
            RecordOutcome::Stored { index, .. } | RecordOutcome::Failed { index, .. } => *index,
        }
    }

    /// Scores computed for the record, stored or not
    pub fn prediction(&self) -> &PredictionResult {
        match self {
            RecordOutcome::Stored { prediction, .. } | RecordOutcome::Failed { prediction, .. } => {
                prediction
            }
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, RecordOutcome::Stored { .. })
    }
}

/// A record that could not be persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    pub index: usize,
    pub reason: String,
}

/// Aggregate result of one ingestion
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    /// Records persisted
    pub stored: usize,
    /// Records that failed, in input order
    pub failed: Vec<RecordFailure>,
    /// Import batch, absent when batch tracking was unavailable
    pub batch_id: Option<BatchId>,
    /// One outcome per input, in input order
    pub outcomes: Vec<RecordOutcome>,
}

impl BatchResult {
    /// Fold per-record outcomes into the aggregate
    pub fn from_outcomes(batch_id: Option<BatchId>, outcomes: Vec<RecordOutcome>) -> Self {
        let mut stored = 0;
        let mut failed = Vec::new();

        for outcome in &outcomes {
            match outcome {
                RecordOutcome::Stored { .. } => stored += 1,
                RecordOutcome::Failed { index, reason, .. } => failed.push(RecordFailure {
                    index: *index,
                    reason: reason.clone(),
                }),
            }
        }

        Self {
            stored,
            failed,
            batch_id,
            outcomes,
        }
    }

    /// Number of input records
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Predictions in input order
    pub fn predictions(&self) -> impl Iterator<Item = &PredictionResult> {
        self.outcomes.iter().map(RecordOutcome::prediction)
    }
}

/// Error message recorded on a failed batch:
/// `"<n> of <total> records failed: #i: reason; ..."`
pub fn summarize_failures(failed: &[RecordFailure], total: usize) -> String {
    let mut reasons: Vec<String> = failed
        .iter()
        .take(MAX_SUMMARY_REASONS)
        .map(|f| format!("#{}: {}", f.index, f.reason))
        .collect();
    if failed.len() > MAX_SUMMARY_REASONS {
        reasons.push(format!("... {} more", failed.len() - MAX_SUMMARY_REASONS));
    }

    format!(
        "{} of {} records failed: {}",
        failed.len(),
        total,
        reasons.join("; ")
    )
}
