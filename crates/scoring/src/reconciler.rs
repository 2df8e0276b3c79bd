//! Score Reconciler Implementation

use crate::prediction::{Method, PredictionResult};
use data_validator::{AnomalyInput, ScoreTriple};
use fallback::FallbackEngine;
use inference_engine::{DependencyProbe, InferenceError, StatisticalPredictor};
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, warn};

/// Chooses between the statistical model and the keyword rules and
/// normalizes the output.
pub struct ScoreReconciler {
    probe: Arc<DependencyProbe>,
    statistical: StatisticalPredictor,
    rules: FallbackEngine,
}

impl ScoreReconciler {
    /// Create a reconciler sharing the process-wide probe
    pub fn new(probe: Arc<DependencyProbe>) -> Self {
        Self::with_rules(probe, FallbackEngine::new())
    }

    /// Create a reconciler with a custom rule engine
    pub fn with_rules(probe: Arc<DependencyProbe>, rules: FallbackEngine) -> Self {
        Self {
            probe,
            statistical: StatisticalPredictor::new(),
            rules,
        }
    }

    /// Score one anomaly. Never fails for a validated record.
    pub fn reconcile(&self, input: &AnomalyInput) -> PredictionResult {
        let result = match self.probe.probe().model() {
            Some(model) => match self.statistical.predict(input, model) {
                Ok(raw) => match ScoreTriple::rounded(raw) {
                    Some(scores) => PredictionResult::new(scores, Method::Statistical),
                    None => {
                        warn!(
                            equipment = %input.equipment_id,
                            "Model returned non-finite scores, falling back to rules"
                        );
                        self.fallback(input, "non_finite_output")
                    }
                },
                Err(e) => {
                    warn!(
                        equipment = %input.equipment_id,
                        error = %e,
                        "Statistical scoring failed, falling back to rules"
                    );
                    self.fallback(input, fallback_reason(&e))
                }
            },
            None => self.rule_based(input),
        };

        counter!("criticality_predictions_total", "method" => result.method().as_str())
            .increment(1);
        debug!(
            equipment = %input.equipment_id,
            method = result.method().as_str(),
            criticality = result.criticality(),
            "Anomaly scored"
        );

        result
    }

    /// Method new requests will use, given the cached probe verdict
    pub fn active_method(&self) -> Method {
        if self.probe.probe().is_available() {
            Method::Statistical
        } else {
            Method::RuleBased
        }
    }

    /// The shared dependency probe
    pub fn probe(&self) -> &DependencyProbe {
        &self.probe
    }

    fn fallback(&self, input: &AnomalyInput, reason: &'static str) -> PredictionResult {
        counter!("criticality_fallbacks_total", "reason" => reason).increment(1);
        self.rule_based(input)
    }

    fn rule_based(&self, input: &AnomalyInput) -> PredictionResult {
        let raw = self.rules.predict(input);
        PredictionResult::new(ScoreTriple::clamped(raw), Method::RuleBased)
    }
}

fn fallback_reason(error: &InferenceError) -> &'static str {
    match error {
        InferenceError::Features(_) => "features",
        InferenceError::InvalidInputShape { .. } => "input_shape",
        InferenceError::InvalidOutput(_) => "invalid_output",
        InferenceError::InferenceFailed(_) | InferenceError::ModelLoadError(_) => "inference",
    }
}
