//! Anomaly Input Record

use serde::{Deserialize, Serialize};

/// A free-text equipment anomaly report as submitted for scoring.
///
/// Field aliases accept the column names used by the maintenance exports
/// (`num_equipement`, `systeme`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyInput {
    /// Equipment identification number
    #[serde(alias = "num_equipement")]
    pub equipment_id: String,
    /// System / category label (e.g. "Hydraulic", "Electrical")
    #[serde(alias = "systeme")]
    pub system: String,
    /// Free-text description, the primary scoring signal
    pub description: String,
    /// Detection date (YYYY-MM-DD)
    #[serde(default, alias = "date_detection")]
    pub detection_date: Option<String>,
    /// Equipment description
    #[serde(default, alias = "description_equipement")]
    pub equipment_description: Option<String>,
    /// Owning section
    #[serde(default, alias = "section_proprietaire")]
    pub owning_section: Option<String>,
}

impl AnomalyInput {
    /// Create a record with only the required fields set
    pub fn new(
        equipment_id: impl Into<String>,
        system: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            equipment_id: equipment_id.into(),
            system: system.into(),
            description: description.into(),
            detection_date: None,
            equipment_description: None,
            owning_section: None,
        }
    }

    pub fn with_detection_date(mut self, date: impl Into<String>) -> Self {
        self.detection_date = Some(date.into());
        self
    }

    pub fn with_equipment_description(mut self, description: impl Into<String>) -> Self {
        self.equipment_description = Some(description.into());
        self
    }

    pub fn with_owning_section(mut self, section: impl Into<String>) -> Self {
        self.owning_section = Some(section.into());
        self
    }
}
