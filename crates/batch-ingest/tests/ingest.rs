//! Batch ingestion against stores that fail in controlled ways.

use async_trait::async_trait;
use batch_ingest::{BatchIngestor, IngestConfig, RecordOutcome};
use data_validator::AnomalyInput;
use inference_engine::DependencyProbe;
use proptest::prelude::*;
use scoring::{Method, PredictionResult, ScoreReconciler};
use std::collections::HashSet;
use std::sync::Arc;
use storage::{
    AnomalyId, AnomalyStore, BatchId, BatchStatus, HumanScores, ImportBatch, Repository,
    StorageError, StorageResult, StoredAnomaly,
};

/// Delegates to an in-memory repository, failing persistence for chosen
/// equipment ids and optionally refusing to create batches.
struct FlakyStore {
    inner: Repository,
    failing_equipment: HashSet<String>,
    batch_tracking: bool,
}

impl FlakyStore {
    fn failing_on(equipment: &[&str]) -> Self {
        Self {
            inner: Repository::new(),
            failing_equipment: equipment.iter().map(|e| e.to_string()).collect(),
            batch_tracking: true,
        }
    }

    fn without_batches(mut self) -> Self {
        self.batch_tracking = false;
        self
    }
}

#[async_trait]
impl AnomalyStore for FlakyStore {
    async fn create_batch(&self, filename: &str, total_records: usize) -> StorageResult<BatchId> {
        if !self.batch_tracking {
            return Err(StorageError::DatabaseError(
                "no such table: import_batches".to_string(),
            ));
        }
        self.inner.create_batch(filename, total_records).await
    }

    async fn store_anomaly(
        &self,
        input: &AnomalyInput,
        prediction: &PredictionResult,
        batch_id: Option<&BatchId>,
    ) -> StorageResult<AnomalyId> {
        if self.failing_equipment.contains(&input.equipment_id) {
            return Err(StorageError::DatabaseError(format!(
                "disk I/O error writing {}",
                input.equipment_id
            )));
        }
        self.inner.store_anomaly(input, prediction, batch_id).await
    }

    async fn update_batch(
        &self,
        batch_id: &BatchId,
        processed_records: usize,
        status: BatchStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        self.inner
            .update_batch(batch_id, processed_records, status, error_message)
            .await
    }

    async fn get_batch(&self, batch_id: &BatchId) -> StorageResult<ImportBatch> {
        self.inner.get_batch(batch_id).await
    }

    async fn get_anomaly(&self, id: &AnomalyId) -> StorageResult<StoredAnomaly> {
        self.inner.get_anomaly(id).await
    }

    async fn list_anomalies(&self, limit: usize, offset: usize) -> StorageResult<Vec<StoredAnomaly>> {
        self.inner.list_anomalies(limit, offset).await
    }

    async fn set_human_scores(
        &self,
        id: &AnomalyId,
        scores: HumanScores,
    ) -> StorageResult<StoredAnomaly> {
        self.inner.set_human_scores(id, scores).await
    }
}

fn reconciler() -> Arc<ScoreReconciler> {
    Arc::new(ScoreReconciler::new(Arc::new(DependencyProbe::disabled(
        "model not deployed",
    ))))
}

fn ingestor(store: Arc<dyn AnomalyStore>, max_in_flight: usize) -> BatchIngestor {
    BatchIngestor::new(store, reconciler(), IngestConfig { max_in_flight })
}

fn three_records() -> Vec<AnomalyInput> {
    vec![
        AnomalyInput::new("EQ001", "Hydraulic", "Pressure drop detected in main valve"),
        AnomalyInput::new("EQ002", "Mechanical", "Routine calibration check"),
        AnomalyInput::new("EQ003", "Electrical", "Cable insulation worn"),
    ]
}

#[tokio::test]
async fn second_record_failure_is_itemized() {
    let store = Arc::new(FlakyStore::failing_on(&["EQ002"]));
    let result = ingestor(store.clone(), 1)
        .ingest(&three_records(), Some("january.csv"))
        .await;

    assert_eq!(result.stored, 2);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].index, 1);
    assert!(result.failed[0].reason.contains("disk I/O error"));

    let batch = store.get_batch(&result.batch_id.unwrap()).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Failed);
    assert_eq!(batch.filename, "january.csv");
    assert_eq!(batch.total_records, 3);
    assert_eq!(batch.processed_records, 2);
    assert!(batch.completed_at.is_some());
    let message = batch.error_message.unwrap();
    assert!(message.starts_with("1 of 3 records failed: #1:"));
}

#[tokio::test]
async fn later_records_scored_normally_after_failure() {
    let store = Arc::new(FlakyStore::failing_on(&["EQ001"]));
    let result = ingestor(store.clone(), 1).ingest(&three_records(), None).await;

    assert_eq!(result.stored, 2);
    let stored: Vec<_> = store.inner.list_anomalies(10, 0).await.unwrap();
    let ids: Vec<_> = stored.iter().map(|a| a.input.equipment_id.as_str()).collect();
    assert_eq!(ids, vec!["EQ003", "EQ002"]);

    let calibration = stored.iter().find(|a| a.input.equipment_id == "EQ002").unwrap();
    assert_eq!(calibration.ai_criticality, 6);
    assert_eq!(calibration.import_batch_id, result.batch_id);
}

#[tokio::test]
async fn all_stored_marks_batch_completed() {
    let store = Arc::new(Repository::new());
    let result = ingestor(store.clone(), 1)
        .ingest(&three_records(), Some("clean.csv"))
        .await;

    assert_eq!(result.stored, 3);
    assert!(result.failed.is_empty());

    let batch = store.get_batch(&result.batch_id.unwrap()).await.unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.processed_records, 3);
    assert!(batch.error_message.is_none());
}

#[tokio::test]
async fn batch_creation_failure_degrades_to_untracked() {
    let store = Arc::new(FlakyStore::failing_on(&["EQ003"]).without_batches());
    let result = ingestor(store.clone(), 1).ingest(&three_records(), None).await;

    assert!(result.batch_id.is_none());
    assert_eq!(result.stored, 2);
    assert_eq!(result.failed[0].index, 2);

    let stored = store.inner.list_anomalies(10, 0).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|a| a.import_batch_id.is_none()));
}

#[tokio::test]
async fn repository_without_batch_table_still_ingests() {
    let store = Arc::new(Repository::without_batch_tracking());
    let result = ingestor(store.clone(), 1).ingest(&three_records(), None).await;

    assert!(result.batch_id.is_none());
    assert_eq!(result.stored, 3);
    assert_eq!(store.anomaly_count(), 3);
}

#[tokio::test]
async fn parallel_ingestion_keeps_input_order() {
    let inputs: Vec<_> = (0..20)
        .map(|i| AnomalyInput::new(format!("EQ{i:03}"), "Hydraulic", "Leak at flange"))
        .collect();
    let store = Arc::new(FlakyStore::failing_on(&["EQ004", "EQ013"]));

    let result = ingestor(store, 4).ingest(&inputs, Some("parallel.csv")).await;

    let indices: Vec<_> = result.outcomes.iter().map(RecordOutcome::index).collect();
    assert_eq!(indices, (0..20).collect::<Vec<_>>());
    let failed: Vec<_> = result.failed.iter().map(|f| f.index).collect();
    assert_eq!(failed, vec![4, 13]);
    assert_eq!(result.stored, 18);
}

#[tokio::test]
async fn failed_records_still_carry_predictions() {
    let store = Arc::new(FlakyStore::failing_on(&["EQ001"]));
    let result = ingestor(store, 1).ingest(&three_records(), None).await;

    let first = &result.outcomes[0];
    assert!(!first.is_stored());
    assert_eq!(first.prediction().criticality(), 14);
    assert_eq!(first.prediction().method(), Method::RuleBased);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn stored_plus_failed_equals_inputs(
        failing in prop::collection::vec(any::<bool>(), 0..24),
        max_in_flight in 1usize..6,
        tracked in any::<bool>(),
    ) {
        let inputs: Vec<_> = (0..failing.len())
            .map(|i| AnomalyInput::new(format!("EQ{i}"), "Mechanical", "Bearing wear"))
            .collect();
        let failing_ids: Vec<String> = failing
            .iter()
            .enumerate()
            .filter(|(_, fail)| **fail)
            .map(|(i, _)| format!("EQ{i}"))
            .collect();
        let failing_refs: Vec<&str> = failing_ids.iter().map(String::as_str).collect();

        let mut store = FlakyStore::failing_on(&failing_refs);
        if !tracked {
            store = store.without_batches();
        }
        let ingestor = ingestor(Arc::new(store), max_in_flight);

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let result = runtime.block_on(ingestor.ingest(&inputs, None));

        prop_assert_eq!(result.stored + result.failed.len(), inputs.len());
        prop_assert_eq!(result.failed.len(), failing_ids.len());
        prop_assert_eq!(result.batch_id.is_some(), tracked);
    }
}
