//! Data Validation and Normalization
//!
//! Provides the anomaly input record, request validation, bounded severity
//! scores, and the text normalization shared by the scoring paths.

mod error;
mod normalizer;
mod record;
mod score;
mod validator;

pub use error::ValidationError;
pub use normalizer::{normalize_text, tokenize};
pub use record::AnomalyInput;
pub use score::{RawScores, Score, ScoreTriple};
pub use validator::{ValidationConfig, Validator};
