//! Reconciler behavior across the statistical and rule-based paths.

use data_validator::{AnomalyInput, RawScores};
use feature_engine::FeatureVector;
use inference_engine::{DependencyProbe, InferenceError, ScoringModel};
use proptest::prelude::*;
use scoring::{Method, ScoreReconciler};
use std::sync::Arc;

struct FixedModel(RawScores<f64>);

impl ScoringModel for FixedModel {
    fn score(&self, _features: &FeatureVector) -> Result<RawScores<f64>, InferenceError> {
        Ok(self.0)
    }
}

struct FailingModel;

impl ScoringModel for FailingModel {
    fn score(&self, _features: &FeatureVector) -> Result<RawScores<f64>, InferenceError> {
        Err(InferenceError::InferenceFailed("kernel panic in matmul".to_string()))
    }
}

fn with_model(model: impl ScoringModel + 'static) -> ScoreReconciler {
    let model: Arc<dyn ScoringModel> = Arc::new(model);
    let probe = DependencyProbe::with_loader("test", move || Ok(Arc::clone(&model)));
    ScoreReconciler::new(Arc::new(probe))
}

fn without_model() -> ScoreReconciler {
    ScoreReconciler::new(Arc::new(DependencyProbe::from_path(
        "/nonexistent/criticality-model.onnx",
    )))
}

#[test]
fn pressure_drop_hydraulic_rule_based() {
    let reconciler = without_model();
    let input = AnomalyInput::new("EQ001", "Hydraulic", "Pressure drop detected in main valve");

    let result = reconciler.reconcile(&input);

    assert_eq!(result.reliability().value(), 4);
    assert_eq!(result.availability().value(), 5);
    assert_eq!(result.process_safety().value(), 5);
    assert_eq!(result.criticality(), 14);
    assert_eq!(result.method(), Method::RuleBased);
}

#[test]
fn routine_calibration_mechanical_rule_based() {
    let reconciler = without_model();
    let input = AnomalyInput::new("EQ002", "Mechanical", "Routine calibration check");

    let result = reconciler.reconcile(&input);

    assert_eq!(result.reliability().value(), 2);
    assert_eq!(result.availability().value(), 2);
    assert_eq!(result.process_safety().value(), 2);
    assert_eq!(result.criticality(), 6);
    assert_eq!(result.method(), Method::RuleBased);
}

#[test]
fn statistical_output_is_rounded_and_clamped() {
    let reconciler = with_model(FixedModel(RawScores::new(2.5, 9.7, -0.3)));
    let input = AnomalyInput::new("EQ003", "Electrical", "Breaker tripped twice");

    let result = reconciler.reconcile(&input);

    assert_eq!(result.method(), Method::Statistical);
    assert_eq!(result.reliability().value(), 3);
    assert_eq!(result.availability().value(), 5);
    assert_eq!(result.process_safety().value(), 1);
    assert_eq!(result.criticality(), 9);
}

#[test]
fn non_finite_model_output_falls_back() {
    let reconciler = with_model(FixedModel(RawScores::new(f64::NAN, 3.0, 3.0)));
    let input = AnomalyInput::new("EQ004", "Mechanical", "Routine calibration check");

    let result = reconciler.reconcile(&input);

    assert_eq!(result.method(), Method::RuleBased);
    assert_eq!(result.criticality(), 6);
}

#[test]
fn model_error_falls_back() {
    let reconciler = with_model(FailingModel);
    let input = AnomalyInput::new("EQ005", "Electrical", "Cable insulation broken");

    let result = reconciler.reconcile(&input);

    assert_eq!(result.method(), Method::RuleBased);
    assert_eq!(result.process_safety().value(), 5);
}

#[test]
fn empty_normalized_description_falls_back_to_baseline() {
    let reconciler = with_model(FixedModel(RawScores::new(4.0, 4.0, 4.0)));
    let input = AnomalyInput::new("EQ006", "Mechanical", "?!");

    let result = reconciler.reconcile(&input);

    assert_eq!(result.method(), Method::RuleBased);
    assert_eq!(result.criticality(), 9);
}

#[test]
fn probe_is_consulted_once_across_calls() {
    let reconciler = without_model();
    for i in 0..5 {
        let input = AnomalyInput::new(format!("EQ{i}"), "Hydraulic", "Leak at flange");
        assert_eq!(reconciler.reconcile(&input).method(), Method::RuleBased);
    }
    assert!(reconciler.probe().is_resolved());
    assert!(reconciler.probe().probe().reason().is_some());
}

proptest! {
    #[test]
    fn statistical_results_always_bounded(
        r in prop::num::f64::ANY,
        a in prop::num::f64::ANY,
        p in prop::num::f64::ANY,
        desc in "[A-Za-z ]{0,48}",
    ) {
        let reconciler = with_model(FixedModel(RawScores::new(r, a, p)));
        let result = reconciler.reconcile(&AnomalyInput::new("EQ", "Hydraulic", desc));

        let sum = result.reliability().value()
            + result.availability().value()
            + result.process_safety().value();
        for v in [result.reliability(), result.availability(), result.process_safety()] {
            prop_assert!((1..=5).contains(&v.value()));
        }
        prop_assert_eq!(result.criticality(), sum);
    }

    #[test]
    fn unavailable_model_always_rule_based(desc in ".{0,80}", system in ".{0,20}") {
        let reconciler = ScoreReconciler::new(Arc::new(DependencyProbe::disabled("off")));
        let result = reconciler.reconcile(&AnomalyInput::new("EQ", system, desc));
        prop_assert_eq!(result.method(), Method::RuleBased);
        prop_assert!((3..=15).contains(&result.criticality()));
    }
}
