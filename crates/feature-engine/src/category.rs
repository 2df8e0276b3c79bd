//! System Category Classification

use serde::{Deserialize, Serialize};

/// Coarse equipment system category derived from the free-form system label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemCategory {
    Electrical,
    Hydraulic,
    Pneumatic,
    Mechanical,
    Instrumentation,
    Other,
}

impl SystemCategory {
    /// All categories in encoding order
    pub const ALL: [SystemCategory; 6] = [
        SystemCategory::Electrical,
        SystemCategory::Hydraulic,
        SystemCategory::Pneumatic,
        SystemCategory::Mechanical,
        SystemCategory::Instrumentation,
        SystemCategory::Other,
    ];

    /// Classify a system label by case-insensitive substring.
    ///
    /// Electrical is checked first, so "electro-hydraulic" is electrical.
    pub fn from_label(label: &str) -> Self {
        let label = label.to_lowercase();
        if label.contains("electr") || label.contains("électr") {
            SystemCategory::Electrical
        } else if label.contains("hydraul") {
            SystemCategory::Hydraulic
        } else if label.contains("pneumat") {
            SystemCategory::Pneumatic
        } else if label.contains("mechan") || label.contains("mécan") || label.contains("mecan") {
            SystemCategory::Mechanical
        } else if label.contains("instrument") {
            SystemCategory::Instrumentation
        } else {
            SystemCategory::Other
        }
    }

    /// Position of this category in the one-hot encoding
    pub fn index(self) -> usize {
        match self {
            SystemCategory::Electrical => 0,
            SystemCategory::Hydraulic => 1,
            SystemCategory::Pneumatic => 2,
            SystemCategory::Mechanical => 3,
            SystemCategory::Instrumentation => 4,
            SystemCategory::Other => 5,
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemCategory::Electrical => "electrical",
            SystemCategory::Hydraulic => "hydraulic",
            SystemCategory::Pneumatic => "pneumatic",
            SystemCategory::Mechanical => "mechanical",
            SystemCategory::Instrumentation => "instrumentation",
            SystemCategory::Other => "other",
        }
    }
}
