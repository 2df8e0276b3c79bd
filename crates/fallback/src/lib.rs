//! Rule-Based Fallback System
//!
//! Provides deterministic keyword scoring when model inference is unavailable.

mod rules;

pub use rules::{FallbackEngine, RuleAssessment, SeverityTier, TierRule};
