//! In-Memory Repository

use crate::model::{AnomalyId, BatchId, BatchStatus, HumanScores, ImportBatch, StoredAnomaly};
use crate::store::{AnomalyStore, StorageResult};
use crate::StorageError;
use async_trait::async_trait;
use chrono::Utc;
use data_validator::AnomalyInput;
use scoring::PredictionResult;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Repository for data access held entirely in memory
pub struct Repository {
    /// Anomalies in insertion order
    anomalies: Mutex<Vec<StoredAnomaly>>,
    /// Import batches by id
    batches: Mutex<HashMap<BatchId, ImportBatch>>,
    /// Whether the batch table exists
    batch_tracking: bool,
}

impl Repository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        info!("Creating in-memory repository");
        Self {
            anomalies: Mutex::new(Vec::with_capacity(1000)),
            batches: Mutex::new(HashMap::new()),
            batch_tracking: true,
        }
    }

    /// Repository deployed without the import batch table
    pub fn without_batch_tracking() -> Self {
        info!("Creating in-memory repository without batch tracking");
        Self {
            batch_tracking: false,
            ..Self::new()
        }
    }

    /// Get total anomaly count
    pub fn anomaly_count(&self) -> usize {
        self.anomalies.lock().map(|a| a.len()).unwrap_or(0)
    }

    /// Get total batch count
    pub fn batch_count(&self) -> usize {
        self.batches.lock().map(|b| b.len()).unwrap_or(0)
    }

    /// Clear all data (for testing)
    pub fn clear(&self) {
        if let Ok(mut anomalies) = self.anomalies.lock() {
            anomalies.clear();
        }
        if let Ok(mut batches) = self.batches.lock() {
            batches.clear();
        }
    }

    fn lock_anomalies(&self) -> StorageResult<MutexGuard<'_, Vec<StoredAnomaly>>> {
        self.anomalies
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))
    }

    fn lock_batches(&self) -> StorageResult<MutexGuard<'_, HashMap<BatchId, ImportBatch>>> {
        self.batches
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnomalyStore for Repository {
    async fn create_batch(&self, filename: &str, total_records: usize) -> StorageResult<BatchId> {
        if !self.batch_tracking {
            return Err(StorageError::BatchTrackingUnavailable(
                "no such table: import_batches".to_string(),
            ));
        }

        let batch = ImportBatch {
            id: BatchId::new(),
            filename: filename.to_string(),
            total_records,
            processed_records: 0,
            status: BatchStatus::Pending,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        let id = batch.id;
        self.lock_batches()?.insert(id, batch);
        debug!("Created import batch {} ({} records)", id, total_records);
        Ok(id)
    }

    async fn store_anomaly(
        &self,
        input: &AnomalyInput,
        prediction: &PredictionResult,
        batch_id: Option<&BatchId>,
    ) -> StorageResult<AnomalyId> {
        if let Some(batch_id) = batch_id {
            if !self.batch_tracking || !self.lock_batches()?.contains_key(batch_id) {
                return Err(StorageError::ConstraintViolation(format!(
                    "import_batch_id {} references no batch",
                    batch_id
                )));
            }
        }

        let record = StoredAnomaly {
            id: AnomalyId::new(),
            input: input.clone(),
            ai: prediction.scores(),
            ai_criticality: prediction.criticality(),
            method: prediction.method(),
            human: HumanScores::default(),
            status: StoredAnomaly::INITIAL_STATUS.to_string(),
            import_batch_id: batch_id.copied(),
            created_at: Utc::now(),
        };
        let id = record.id;
        self.lock_anomalies()?.push(record);
        debug!("Inserted anomaly with ID {}", id);
        Ok(id)
    }

    async fn update_batch(
        &self,
        batch_id: &BatchId,
        processed_records: usize,
        status: BatchStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        let mut batches = self.lock_batches()?;
        let batch = batches
            .get_mut(batch_id)
            .ok_or_else(|| StorageError::NotFound(format!("import batch {}", batch_id)))?;

        if !batch.status.can_transition_to(status) {
            return Err(StorageError::ConstraintViolation(format!(
                "batch {} cannot move from {} to {}",
                batch_id,
                batch.status.as_str(),
                status.as_str()
            )));
        }

        batch.processed_records = processed_records;
        batch.status = status;
        batch.error_message = error_message.map(str::to_string);
        if status.is_terminal() {
            batch.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn get_batch(&self, batch_id: &BatchId) -> StorageResult<ImportBatch> {
        self.lock_batches()?
            .get(batch_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("import batch {}", batch_id)))
    }

    async fn get_anomaly(&self, id: &AnomalyId) -> StorageResult<StoredAnomaly> {
        self.lock_anomalies()?
            .iter()
            .find(|a| a.id == *id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("anomaly {}", id)))
    }

    async fn list_anomalies(&self, limit: usize, offset: usize) -> StorageResult<Vec<StoredAnomaly>> {
        Ok(self
            .lock_anomalies()?
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn set_human_scores(
        &self,
        id: &AnomalyId,
        scores: HumanScores,
    ) -> StorageResult<StoredAnomaly> {
        let mut anomalies = self.lock_anomalies()?;
        let anomaly = anomalies
            .iter_mut()
            .find(|a| a.id == *id)
            .ok_or_else(|| StorageError::NotFound(format!("anomaly {}", id)))?;
        anomaly.human = scores;
        Ok(anomaly.clone())
    }
}
