//! Statistical Inference Engine
//!
//! Probes the model artifact once per process and scores anomaly records
//! with the loaded ONNX model using tract-onnx.

mod engine;
mod probe;

pub use engine::{OnnxModel, ScoringModel, StatisticalPredictor};
pub use probe::{DependencyProbe, DependencyStatus, ModelLoader};

use feature_engine::FeatureError;
use thiserror::Error;

/// Errors during inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
    #[error("Invalid model output: {0}")]
    InvalidOutput(String),
    #[error("Feature extraction failed: {0}")]
    Features(#[from] FeatureError),
}
