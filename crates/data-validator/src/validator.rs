//! Anomaly Record Validator

use crate::error::ValidationError;
use crate::record::AnomalyInput;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Maximum description length in characters
    pub max_description_chars: usize,
    /// Expected detection date format
    pub date_format: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_description_chars: 5000,
            date_format: "%Y-%m-%d".to_string(),
        }
    }
}

/// Validator that cleans anomaly records before they reach the scoring core
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Trim every field, drop empty optionals, and reject records missing a
    /// required field.
    pub fn validate(&self, input: AnomalyInput) -> Result<AnomalyInput, ValidationError> {
        let equipment_id = required("equipment_id", &input.equipment_id)?;
        let system = required("system", &input.system)?;
        let description = required("description", &input.description)?;

        let length = description.chars().count();
        if length > self.config.max_description_chars {
            return Err(ValidationError::InvalidFormat(format!(
                "description is {} characters, limit is {}",
                length, self.config.max_description_chars
            )));
        }

        let detection_date = optional(input.detection_date.as_deref());
        if let Some(date) = &detection_date {
            self.validate_date(date)?;
        }

        Ok(AnomalyInput {
            equipment_id,
            system,
            description,
            detection_date,
            equipment_description: optional(input.equipment_description.as_deref()),
            owning_section: optional(input.owning_section.as_deref()),
        })
    }

    /// Validate a detection date against the configured format
    pub fn validate_date(&self, date: &str) -> Result<NaiveDate, ValidationError> {
        NaiveDate::parse_from_str(date, &self.config.date_format).map_err(|e| {
            ValidationError::InvalidFormat(format!("detection_date '{}': {}", date, e))
        })
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        debug!("Rejecting record: {} is empty", field);
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
