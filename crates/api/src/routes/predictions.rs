//! Prediction Routes

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use data_validator::AnomalyInput;
use scoring::PredictionResult;
use std::sync::Arc;

use crate::{ApiError, AppState};

/// Score an anomaly without persisting it
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AnomalyInput>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let Json(input) = body?;
    let input = state.validator.validate(input)?;

    Ok(Json(state.reconciler.reconcile(&input)))
}
