//! Persistence Boundary

use crate::model::{AnomalyId, BatchId, BatchStatus, HumanScores, ImportBatch, StoredAnomaly};
use crate::StorageError;
use async_trait::async_trait;
use data_validator::AnomalyInput;
use scoring::PredictionResult;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Backend-agnostic anomaly store.
///
/// Guarantees:
/// - `store_anomaly` writes the AI scores once; nothing later overwrites them.
/// - `create_batch` returns `StorageError::BatchTrackingUnavailable` when the
///   batch table does not exist, so callers can proceed without a batch.
/// - `update_batch` rejects transitions out of a terminal status.
#[async_trait]
pub trait AnomalyStore: Send + Sync {
    /// Create a `pending` import batch
    async fn create_batch(&self, filename: &str, total_records: usize) -> StorageResult<BatchId>;

    /// Persist a scored anomaly, optionally linked to a batch
    async fn store_anomaly(
        &self,
        input: &AnomalyInput,
        prediction: &PredictionResult,
        batch_id: Option<&BatchId>,
    ) -> StorageResult<AnomalyId>;

    /// Record batch progress; terminal statuses also set `completed_at`
    async fn update_batch(
        &self,
        batch_id: &BatchId,
        processed_records: usize,
        status: BatchStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()>;

    async fn get_batch(&self, batch_id: &BatchId) -> StorageResult<ImportBatch>;

    async fn get_anomaly(&self, id: &AnomalyId) -> StorageResult<StoredAnomaly>;

    /// Anomalies newest first
    async fn list_anomalies(&self, limit: usize, offset: usize) -> StorageResult<Vec<StoredAnomaly>>;

    /// Replace the expert overrides of an anomaly; AI scores are untouched
    async fn set_human_scores(
        &self,
        id: &AnomalyId,
        scores: HumanScores,
    ) -> StorageResult<StoredAnomaly>;
}
