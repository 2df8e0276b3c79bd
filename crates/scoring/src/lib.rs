//! Score Reconciliation
//!
//! Single entry point for scoring an anomaly: routes to the statistical model
//! when the probe reports it usable, falls back to keyword rules otherwise,
//! and always returns a bounded result.

mod prediction;
mod reconciler;

pub use prediction::{Method, PredictionResult};
pub use reconciler::ScoreReconciler;
