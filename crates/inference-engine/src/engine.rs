//! Statistical Scoring Implementation

use crate::InferenceError;
use data_validator::{AnomalyInput, RawScores};
use feature_engine::{FeatureVector, TextFeatureExtractor, FEATURE_DIMENSION};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tract_onnx::prelude::*;

/// A loaded model exposing one pure scoring operation.
///
/// Outputs are raw reliability, availability and process-safety values.
/// They are not required to be in range; the caller rounds and clamps.
pub trait ScoringModel: Send + Sync {
    fn score(&self, features: &FeatureVector) -> Result<RawScores<f64>, InferenceError>;

    /// Human-readable identification for logs and health output
    fn describe(&self) -> String {
        "scoring model".to_string()
    }
}

/// ONNX regression model with a `[1, FEATURE_DIMENSION]` f32 input and a
/// three-value output.
pub struct OnnxModel {
    plan: TypedRunnableModel<TypedModel>,
    path: PathBuf,
}

impl OnnxModel {
    /// Load and optimize the model artifact
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        info!("Loading scoring model from {}", path.display());

        if !path.is_file() {
            return Err(InferenceError::ModelLoadError(format!(
                "model artifact not found at {}",
                path.display()
            )));
        }

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, FEATURE_DIMENSION]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| {
                InferenceError::ModelLoadError(format!("{}: {}", path.display(), e))
            })?;

        Ok(Self {
            plan,
            path: path.to_path_buf(),
        })
    }

    /// Get model path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScoringModel for OnnxModel {
    fn score(&self, features: &FeatureVector) -> Result<RawScores<f64>, InferenceError> {
        if features.values.len() != FEATURE_DIMENSION {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("[1, {}]", FEATURE_DIMENSION),
                actual: format!("[1, {}]", features.values.len()),
            });
        }

        let input: Tensor =
            tract_ndarray::Array2::from_shape_vec((1, FEATURE_DIMENSION), features.values.clone())
                .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?
                .into();

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let output = outputs
            .first()
            .ok_or_else(|| InferenceError::InvalidOutput("model produced no outputs".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::InvalidOutput(e.to_string()))?;
        let values: Vec<f64> = view.iter().map(|v| *v as f64).collect();

        match values.as_slice() {
            [reliability, availability, process_safety] => {
                Ok(RawScores::new(*reliability, *availability, *process_safety))
            }
            other => Err(InferenceError::InvalidOutput(format!(
                "expected 3 values, got {}",
                other.len()
            ))),
        }
    }

    fn describe(&self) -> String {
        format!("onnx:{}", self.path.display())
    }
}

/// Runs feature extraction and model scoring for one record
#[derive(Debug, Clone, Default)]
pub struct StatisticalPredictor {
    extractor: TextFeatureExtractor,
}

impl StatisticalPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score a record with the loaded model.
    ///
    /// The returned values are unbounded model output.
    pub fn predict(
        &self,
        input: &AnomalyInput,
        model: &dyn ScoringModel,
    ) -> Result<RawScores<f64>, InferenceError> {
        let start = std::time::Instant::now();
        let features = self.extractor.extract(input)?;
        let raw = model.score(&features)?;

        debug!(
            "Statistical scoring completed in {}us: ({:.3}, {:.3}, {:.3})",
            start.elapsed().as_micros(),
            raw.reliability,
            raw.availability,
            raw.process_safety
        );

        Ok(raw)
    }
}
