//! Keyword Rules

use data_validator::{tokenize, AnomalyInput, RawScores, Score};
use feature_engine::SystemCategory;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Severity tier selected by keyword matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityTier {
    /// No keyword matched; scored like a medium anomaly
    Baseline,
    /// Routine work (calibration, maintenance, checks)
    Low,
    /// Degradation (wear, drift, drops)
    Medium,
    /// Failure, leak, fire, pressure excursions
    Critical,
}

impl SeverityTier {
    /// Base scores before the category adjustment
    pub fn base_scores(self) -> RawScores<i64> {
        match self {
            SeverityTier::Critical => RawScores::new(4, 4, 5),
            SeverityTier::Medium => RawScores::new(3, 3, 3),
            SeverityTier::Low => RawScores::new(2, 2, 2),
            SeverityTier::Baseline => RawScores::new(3, 3, 3),
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityTier::Critical => "critical",
            SeverityTier::Medium => "medium",
            SeverityTier::Low => "low",
            SeverityTier::Baseline => "baseline",
        }
    }
}

/// Keywords that select a tier.
///
/// A keyword matches any token containing it, so `leak` also covers
/// `leaking` and `pressure` covers `overpressure`.
#[derive(Debug, Clone)]
pub struct TierRule {
    pub tier: SeverityTier,
    pub keywords: Vec<&'static str>,
}

impl TierRule {
    fn matches(&self, tokens: &[String]) -> bool {
        tokens
            .iter()
            .any(|token| self.keywords.iter().any(|kw| token.contains(kw)))
    }
}

/// Outcome of rule evaluation, kept for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleAssessment {
    pub tier: SeverityTier,
    pub category: SystemCategory,
    pub scores: RawScores<i64>,
}

/// Deterministic keyword rule engine
pub struct FallbackEngine {
    /// Rules ordered from most to least severe
    rules: Vec<TierRule>,
}

impl FallbackEngine {
    /// Create the engine with the standard keyword tiers
    pub fn new() -> Self {
        Self {
            rules: vec![
                TierRule {
                    tier: SeverityTier::Critical,
                    keywords: vec![
                        "failure", "fail", "broken", "leak", "fire", "explosion", "explode",
                        "pressure", "overheat", "burst", "rupture", "smoke", "spark", "flame",
                        "crack", "seized",
                    ],
                },
                TierRule {
                    tier: SeverityTier::Medium,
                    keywords: vec![
                        "wear", "drift", "irregularities", "drop", "issue", "vibration", "noise",
                        "corrosion", "abnormal", "fluctuation",
                    ],
                },
                TierRule {
                    tier: SeverityTier::Low,
                    keywords: vec![
                        "calibration", "maintenance", "check", "inspection", "routine",
                        "cleaning", "lubrication",
                    ],
                },
            ],
        }
    }

    /// Create the engine with custom rules.
    ///
    /// Rules are re-sorted most severe first so precedence does not depend
    /// on the order given.
    pub fn with_rules(mut rules: Vec<TierRule>) -> Self {
        rules.sort_by(|a, b| b.tier.cmp(&a.tier));
        Self { rules }
    }

    /// Tier of a description; the first matching tier, most severe first
    pub fn classify(&self, description: &str) -> SeverityTier {
        let tokens = tokenize(description);
        self.rules
            .iter()
            .find(|rule| rule.matches(&tokens))
            .map(|rule| rule.tier)
            .unwrap_or(SeverityTier::Baseline)
    }

    /// Evaluate tier and category adjustment for a record
    pub fn assess(&self, input: &AnomalyInput) -> RuleAssessment {
        let tier = self.classify(&input.description);
        let category = SystemCategory::from_label(&input.system);
        let mut scores = tier.base_scores();

        match category {
            SystemCategory::Electrical => {
                scores.process_safety = bump(scores.process_safety);
            }
            SystemCategory::Hydraulic | SystemCategory::Pneumatic => {
                scores.availability = bump(scores.availability);
            }
            _ => {}
        }

        debug!(
            "Rule assessment: tier={}, category={}, scores=({}, {}, {})",
            tier.as_str(),
            category.as_str(),
            scores.reliability,
            scores.availability,
            scores.process_safety
        );

        RuleAssessment {
            tier,
            category,
            scores,
        }
    }

    /// Score a record. Total: every input yields a result.
    pub fn predict(&self, input: &AnomalyInput) -> RawScores<i64> {
        self.assess(input).scores
    }
}

impl Default for FallbackEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn bump(value: i64) -> i64 {
    (value + 1).min(Score::MAX as i64)
}
