//! Anomaly Routes

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use batch_ingest::{RecordFailure, RecordOutcome};
use data_validator::{AnomalyInput, Score, ScoreTriple, ValidationError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{AnomalyId, BatchId, HumanScores, StoredAnomaly};
use tracing::info;

use crate::{ApiError, AppState, InvalidRecord};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

/// Stored anomaly with the derived final assessment
#[derive(Debug, Serialize)]
pub struct AnomalyView {
    #[serde(flatten)]
    pub anomaly: StoredAnomaly,
    pub final_scores: ScoreTriple,
    pub final_criticality: u8,
}

impl From<StoredAnomaly> for AnomalyView {
    fn from(anomaly: StoredAnomaly) -> Self {
        Self {
            final_scores: anomaly.final_scores(),
            final_criticality: anomaly.final_criticality(),
            anomaly,
        }
    }
}

/// Query parameters for the listing endpoint
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Response for the listing endpoint
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub data: Vec<AnomalyView>,
    pub count: usize,
}

/// Query parameters for the batch endpoint
#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    pub filename: Option<String>,
}

/// Response for the batch endpoint
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub total: usize,
    pub stored: usize,
    pub failed: Vec<RecordFailure>,
    pub import_batch_id: Option<BatchId>,
    pub predictions: Vec<RecordOutcome>,
}

/// Expert overrides; omitted or null metrics clear the override
#[derive(Debug, Default, Deserialize)]
pub struct ReviewRequest {
    pub reliability: Option<i64>,
    pub availability: Option<i64>,
    pub process_safety: Option<i64>,
}

impl ReviewRequest {
    fn into_human_scores(self) -> Result<HumanScores, ValidationError> {
        Ok(HumanScores {
            reliability: review_score("reliability", self.reliability)?,
            availability: review_score("availability", self.availability)?,
            process_safety: review_score("process_safety", self.process_safety)?,
        })
    }
}

fn review_score(field: &'static str, value: Option<i64>) -> Result<Option<Score>, ValidationError> {
    value
        .map(|v| {
            u8::try_from(v)
                .ok()
                .and_then(|b| Score::new(b).ok())
                .ok_or(ValidationError::OutOfRange {
                    field,
                    value: v,
                    min: i64::from(Score::MIN),
                    max: i64::from(Score::MAX),
                })
        })
        .transpose()
}

fn parse_id(raw: &str) -> Result<AnomalyId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("anomaly {}", raw)))
}

/// Score, persist and return one anomaly
pub async fn create_anomaly(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnomalyInput>, JsonRejection>,
) -> Result<(StatusCode, Json<AnomalyView>), ApiError> {
    let Json(input) = body?;
    let input = state.validator.validate(input)?;

    let prediction = state.reconciler.reconcile(&input);
    let id = state.store.store_anomaly(&input, &prediction, None).await?;
    let stored = state.store.get_anomaly(&id).await?;

    Ok((StatusCode::CREATED, Json(stored.into())))
}

/// Get one anomaly
pub async fn get_anomaly(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AnomalyView>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.store.get_anomaly(&id).await?.into()))
}

/// List anomalies, newest first
pub async fn list_anomalies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let offset = params.offset.unwrap_or(0);

    let data: Vec<AnomalyView> = state
        .store
        .list_anomalies(limit, offset)
        .await?
        .into_iter()
        .map(AnomalyView::from)
        .collect();

    Ok(Json(ListResponse {
        count: data.len(),
        data,
    }))
}

/// Record expert scores for an anomaly
pub async fn review_anomaly(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<ReviewRequest>, JsonRejection>,
) -> Result<Json<AnomalyView>, ApiError> {
    let id = parse_id(&id)?;
    let Json(review) = body?;
    let scores = review.into_human_scores()?;

    let reviewed = state.store.set_human_scores(&id, scores).await?;
    info!(anomaly = %id, final_criticality = reviewed.final_criticality(), "Anomaly reviewed");
    Ok(Json(reviewed.into()))
}

/// Validate, score and persist a batch of anomalies.
///
/// Per-record persistence failures are reported in the body with a 200.
pub async fn ingest_batch(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BatchQuery>,
    body: Result<Json<Vec<AnomalyInput>>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let Json(records) = body?;
    if records.is_empty() {
        return Err(ApiError::EmptyBatch);
    }

    let mut valid = Vec::with_capacity(records.len());
    let mut invalid = Vec::new();
    for (index, record) in records.into_iter().enumerate() {
        match state.validator.validate(record) {
            Ok(record) => valid.push(record),
            Err(e) => invalid.push(InvalidRecord {
                index,
                reason: e.to_string(),
            }),
        }
    }
    if !invalid.is_empty() {
        return Err(ApiError::InvalidRecords(invalid));
    }

    let result = state
        .ingestor
        .ingest(&valid, params.filename.as_deref())
        .await;

    Ok(Json(BatchResponse {
        total: result.total(),
        stored: result.stored,
        failed: result.failed,
        import_batch_id: result.batch_id,
        predictions: result.outcomes,
    }))
}
