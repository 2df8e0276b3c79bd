//! Feature Vector Assembly

use crate::category::SystemCategory;
use crate::FeatureError;
use data_validator::{tokenize, AnomalyInput};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One-hot system category slots
pub const CATEGORY_SLOTS: usize = 6;
/// Summary statistics over the description tokens
pub const LEXICAL_SLOTS: usize = 4;
/// Hashed term-frequency buckets for the description
pub const TEXT_BUCKETS: usize = 96;
/// Number of features in the vector
pub const FEATURE_DIMENSION: usize = CATEGORY_SLOTS + LEXICAL_SLOTS + TEXT_BUCKETS;

/// Feature vector for ML inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Raw feature values (`FEATURE_DIMENSION` wide)
    pub values: Vec<f32>,
    /// Category the system label was encoded as
    pub category: SystemCategory,
    /// Number of description tokens
    pub token_count: usize,
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            values: vec![0.0; FEATURE_DIMENSION],
            category: SystemCategory::Other,
            token_count: 0,
        }
    }
}

/// Feature extractor for anomaly records.
///
/// Layout: `[category one-hot | lexical stats | hashed term frequencies]`.
/// Hashing is FNV-1a so vectors are stable across processes and builds.
#[derive(Debug, Clone, Default)]
pub struct TextFeatureExtractor;

impl TextFeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract features from an anomaly record
    pub fn extract(&self, input: &AnomalyInput) -> Result<FeatureVector, FeatureError> {
        let tokens = tokenize(&input.description);
        if tokens.is_empty() {
            return Err(FeatureError::EmptyDescription);
        }

        let category = SystemCategory::from_label(&input.system);
        let mut values = vec![0.0f32; FEATURE_DIMENSION];

        values[category.index()] = 1.0;

        let n = tokens.len() as f32;
        let lexical = CATEGORY_SLOTS;
        let total_chars: usize = tokens.iter().map(|t| t.chars().count()).sum();
        let numeric = tokens
            .iter()
            .filter(|t| t.chars().all(|c| c.is_ascii_digit()))
            .count();
        let mut unique: Vec<&str> = tokens.iter().map(String::as_str).collect();
        unique.sort_unstable();
        unique.dedup();

        values[lexical] = (1.0 + n).ln();
        values[lexical + 1] = total_chars as f32 / n;
        values[lexical + 2] = numeric as f32 / n;
        values[lexical + 3] = unique.len() as f32 / n;

        let text = CATEGORY_SLOTS + LEXICAL_SLOTS;
        for token in &tokens {
            let bucket = (fnv1a(token.as_bytes()) % TEXT_BUCKETS as u32) as usize;
            values[text + bucket] += 1.0 / n;
        }

        debug!(
            "Extracted {} features: category={}, tokens={}",
            values.len(),
            category.as_str(),
            tokens.len()
        );

        Ok(FeatureVector {
            values,
            category,
            token_count: tokens.len(),
        })
    }
}

fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_feature_extraction() {
        let extractor = TextFeatureExtractor::new();
        let input = AnomalyInput::new("EQ001", "Hydraulic", "Pressure drop detected in main valve");

        let features = extractor.extract(&input).unwrap();

        assert_eq!(features.values.len(), FEATURE_DIMENSION);
        assert_eq!(features.category, SystemCategory::Hydraulic);
        assert_eq!(features.token_count, 6);
        assert_eq!(features.values[SystemCategory::Hydraulic.index()], 1.0);
        assert_eq!(features.values[SystemCategory::Electrical.index()], 0.0);

        let text_mass: f32 = features.values[CATEGORY_SLOTS + LEXICAL_SLOTS..].iter().sum();
        assert!((text_mass - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_description_fails() {
        let extractor = TextFeatureExtractor::new();
        let input = AnomalyInput::new("EQ001", "Hydraulic", " -- !! ");
        assert_eq!(extractor.extract(&input), Err(FeatureError::EmptyDescription));
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let extractor = TextFeatureExtractor::new();
        let a = extractor
            .extract(&AnomalyInput::new("EQ1", "Electrical", "Breaker TRIPPED!"))
            .unwrap();
        let b = extractor
            .extract(&AnomalyInput::new("EQ2", "electrical", "breaker tripped"))
            .unwrap();
        assert_eq!(a.values, b.values);
    }

    #[test]
    fn test_fnv1a_known_value() {
        assert_eq!(fnv1a(b""), 0x811c_9dc5);
        assert_eq!(fnv1a(b"a"), 0xe40c_292c);
    }

    proptest! {
        #[test]
        fn extraction_is_deterministic(desc in "[a-z ]{1,64}[a-z]", system in "[A-Za-z]{0,16}") {
            let extractor = TextFeatureExtractor::new();
            let input = AnomalyInput::new("EQ", system, desc);
            let first = extractor.extract(&input).unwrap();
            let second = extractor.extract(&input).unwrap();
            prop_assert_eq!(first.values.len(), FEATURE_DIMENSION);
            prop_assert_eq!(first, second);
        }
    }
}
