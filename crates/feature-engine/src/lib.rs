//! Feature Engineering Engine
//!
//! Turns anomaly records into fixed-width feature vectors for model inference.

mod category;
mod features;

pub use category::SystemCategory;
pub use features::{
    FeatureVector, TextFeatureExtractor, CATEGORY_SLOTS, FEATURE_DIMENSION, LEXICAL_SLOTS,
    TEXT_BUCKETS,
};

use thiserror::Error;

/// Errors during feature extraction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    #[error("Description is empty after normalization")]
    EmptyDescription,
}
