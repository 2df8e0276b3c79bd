//! Anomaly Criticality API Server
//!
//! REST API for scoring, storing, importing and reviewing equipment anomalies.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use batch_ingest::{BatchIngestor, IngestConfig};
use data_validator::Validator;
use inference_engine::DependencyProbe;
use metrics_exporter_prometheus::PrometheusHandle;
use scoring::ScoreReconciler;
use serde::Serialize;
use std::sync::Arc;
use storage::{AnomalyStore, Repository, SchemaOptions, SqliteStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod config;
mod error;
mod routes;
mod telemetry;

pub use crate::config::AppConfig;
pub use error::{ApiError, InvalidRecord};
pub use telemetry::{init_logging, install_metrics_recorder};

/// Application state shared across handlers
pub struct AppState {
    /// Score reconciler sharing the process-wide probe
    pub reconciler: Arc<ScoreReconciler>,
    /// Persistence backend
    pub store: Arc<dyn AnomalyStore>,
    /// Batch coordinator
    pub ingestor: BatchIngestor,
    /// Request validation
    pub validator: Validator,
    /// Prometheus exporter, when installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(
        store: Arc<dyn AnomalyStore>,
        reconciler: Arc<ScoreReconciler>,
        ingest: IngestConfig,
    ) -> Self {
        let ingestor = BatchIngestor::new(Arc::clone(&store), Arc::clone(&reconciler), ingest);
        Self {
            reconciler,
            store,
            ingestor,
            validator: Validator::default(),
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }

    /// Attach a Prometheus handle for `GET /metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build state from configuration: open storage and probe the model once
    pub async fn from_config(config: &AppConfig) -> Result<Self, ApiError> {
        let store: Arc<dyn AnomalyStore> = if config.storage.is_in_memory_repository() {
            if config.storage.batch_tracking {
                Arc::new(Repository::new())
            } else {
                Arc::new(Repository::without_batch_tracking())
            }
        } else {
            let options = SchemaOptions {
                batch_tracking: config.storage.batch_tracking,
            };
            Arc::new(SqliteStore::connect(&config.storage.database_url, options).await?)
        };

        let probe = Arc::new(DependencyProbe::from_path(&config.model.path));
        // Resolve at startup so the first request does not pay for the load
        probe.probe();
        let reconciler = Arc::new(ScoreReconciler::new(probe));

        Ok(Self::new(store, reconciler, config.ingest.clone()))
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub model: ModelHealth,
}

/// Statistical model status
#[derive(Debug, Serialize)]
pub struct ModelHealth {
    pub available: bool,
    pub source: String,
    pub reason: Option<String>,
    pub active_method: String,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/predict", post(routes::predictions::predict))
        .route(
            "/api/v1/anomalies",
            post(routes::anomalies::create_anomaly).get(routes::anomalies::list_anomalies),
        )
        .route("/api/v1/anomalies/batch", post(routes::anomalies::ingest_batch))
        .route("/api/v1/anomalies/:id", get(routes::anomalies::get_anomaly))
        .route("/api/v1/anomalies/:id/review", put(routes::anomalies::review_anomaly))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let probe = state.reconciler.probe();
    let status = probe.probe();

    let response = HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        model: ModelHealth {
            available: status.is_available(),
            source: probe.source().to_string(),
            reason: status.reason().map(str::to_string),
            active_method: state.reconciler.active_method().as_str().to_string(),
        },
    };

    Json(response)
}

/// Prometheus scrape endpoint
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}

/// Run the server
pub async fn run_server(config: AppConfig) -> Result<(), ApiError> {
    let metrics = install_metrics_recorder()?;
    let state = AppState::from_config(&config).await?.with_metrics(metrics);
    let app = create_router(Arc::new(state));

    info!("Starting API server on {}", config.server.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .map_err(|e| ApiError::Startup(format!("bind {}: {}", config.server.bind_addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| ApiError::Startup(e.to_string()))?;

    Ok(())
}
