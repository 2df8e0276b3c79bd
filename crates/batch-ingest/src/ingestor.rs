//! Batch Ingestion Coordinator

use crate::outcome::{summarize_failures, BatchResult, RecordOutcome};
use chrono::Utc;
use data_validator::AnomalyInput;
use futures::stream::{self, StreamExt};
use metrics::counter;
use scoring::ScoreReconciler;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{AnomalyStore, BatchId, BatchStatus, StorageError};
use tracing::{debug, info, warn};

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Records scored and stored concurrently; results stay in input order
    pub max_in_flight: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { max_in_flight: 1 }
    }
}

/// Coordinates scoring and persistence of a batch of anomalies
pub struct BatchIngestor {
    store: Arc<dyn AnomalyStore>,
    reconciler: Arc<ScoreReconciler>,
    config: IngestConfig,
}

impl BatchIngestor {
    /// Create a new coordinator
    pub fn new(
        store: Arc<dyn AnomalyStore>,
        reconciler: Arc<ScoreReconciler>,
        config: IngestConfig,
    ) -> Self {
        info!("Creating batch ingestor with config: {:?}", config);
        Self {
            store,
            reconciler,
            config,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Score and persist every input.
    ///
    /// Never fails as a whole: batch creation problems degrade to an untracked
    /// import and per-record persistence errors are itemized in the result.
    /// `stored + failed.len() == inputs.len()` always holds.
    pub async fn ingest(&self, inputs: &[AnomalyInput], filename: Option<&str>) -> BatchResult {
        let total = inputs.len();
        let filename = filename
            .map(str::to_string)
            .unwrap_or_else(default_batch_name);

        let batch_id = self.open_batch(&filename, total).await;

        let pending: Vec<_> = inputs
            .iter()
            .enumerate()
            .map(|(index, input)| self.process_record(index, input, batch_id.as_ref()))
            .collect();
        let outcomes: Vec<RecordOutcome> = stream::iter(pending)
            .buffered(self.config.max_in_flight.max(1))
            .collect()
            .await;

        let result = BatchResult::from_outcomes(batch_id, outcomes);

        if let Some(batch_id) = &result.batch_id {
            self.close_batch(batch_id, &result).await;
        }

        info!(
            filename = %filename,
            stored = result.stored,
            failed = result.failed.len(),
            tracked = result.batch_id.is_some(),
            "Batch ingestion finished"
        );
        result
    }

    async fn open_batch(&self, filename: &str, total: usize) -> Option<BatchId> {
        let batch_id = match self.store.create_batch(filename, total).await {
            Ok(id) => id,
            Err(e) => {
                match &e {
                    StorageError::BatchTrackingUnavailable(_) => {
                        warn!("Batch tracking unavailable, storing records without a batch: {}", e);
                    }
                    _ => {
                        warn!("Could not create import batch, continuing without one: {}", e);
                    }
                }
                counter!("ingest_batches_total", "tracking" => "untracked").increment(1);
                return None;
            }
        };
        counter!("ingest_batches_total", "tracking" => "tracked").increment(1);

        if let Err(e) = self
            .store
            .update_batch(&batch_id, 0, BatchStatus::Processing, None)
            .await
        {
            warn!("Could not mark batch {} as processing: {}", batch_id, e);
        }
        debug!("Opened import batch {} for {} records", batch_id, total);
        Some(batch_id)
    }

    async fn process_record(
        &self,
        index: usize,
        input: &AnomalyInput,
        batch_id: Option<&BatchId>,
    ) -> RecordOutcome {
        let prediction = self.reconciler.reconcile(input);

        match self.store.store_anomaly(input, &prediction, batch_id).await {
            Ok(anomaly_id) => {
                counter!("ingest_records_total", "outcome" => "stored").increment(1);
                RecordOutcome::Stored {
                    index,
                    anomaly_id,
                    prediction,
                }
            }
            Err(e) => {
                warn!(
                    index,
                    equipment = %input.equipment_id,
                    error = %e,
                    "Failed to store anomaly"
                );
                counter!("ingest_records_total", "outcome" => "failed").increment(1);
                RecordOutcome::Failed {
                    index,
                    prediction,
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn close_batch(&self, batch_id: &BatchId, result: &BatchResult) {
        let (status, message) = if result.is_complete_success() {
            (BatchStatus::Completed, None)
        } else {
            (
                BatchStatus::Failed,
                Some(summarize_failures(&result.failed, result.total())),
            )
        };

        if let Err(e) = self
            .store
            .update_batch(batch_id, result.stored, status, message.as_deref())
            .await
        {
            warn!("Could not finalize batch {}: {}", batch_id, e);
        }
    }
}

fn default_batch_name() -> String {
    format!("batch-{}", Utc::now().format("%Y%m%dT%H%M%SZ"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference_engine::DependencyProbe;
    use storage::Repository;

    fn ingestor(store: Arc<Repository>) -> BatchIngestor {
        let reconciler = ScoreReconciler::new(Arc::new(DependencyProbe::disabled("off")));
        BatchIngestor::new(store, Arc::new(reconciler), IngestConfig::default())
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn test_ingest_future_is_send() {
        let ingestor = ingestor(Arc::new(Repository::new()));
        let inputs = vec![AnomalyInput::new("EQ001", "Hydraulic", "Leak")];
        assert_send(ingestor.ingest(&inputs, Some("send.csv")));
    }

    #[test]
    fn test_default_batch_name() {
        let name = default_batch_name();
        assert!(name.starts_with("batch-"));
        assert!(name.ends_with('Z'));
    }

    #[test]
    fn test_config_defaults_sequential() {
        assert_eq!(IngestConfig::default().max_in_flight, 1);
        let parsed: IngestConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.max_in_flight, 1);
    }

    #[tokio::test]
    async fn test_empty_batch_completes() {
        let store = Arc::new(Repository::new());
        let result = ingestor(Arc::clone(&store)).ingest(&[], Some("empty.csv")).await;

        assert_eq!(result.stored, 0);
        assert!(result.failed.is_empty());
        let batch = store.get_batch(&result.batch_id.unwrap()).await.unwrap();
        assert_eq!(batch.status, BatchStatus::Completed);
        assert_eq!(batch.total_records, 0);
    }

    #[tokio::test]
    async fn test_missing_filename_gets_generated_label() {
        let store = Arc::new(Repository::new());
        let inputs = vec![AnomalyInput::new("EQ001", "Hydraulic", "Leak")];
        let result = ingestor(Arc::clone(&store)).ingest(&inputs, None).await;

        let batch = store.get_batch(&result.batch_id.unwrap()).await.unwrap();
        assert!(batch.filename.starts_with("batch-"));
    }
}
