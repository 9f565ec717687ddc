//! Hair-loss assessment returned by the analysis model.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use crate::constants::GRAFT_DISTRIBUTION_TOLERANCE;

/// Language the assessment summary is written in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English
    #[default]
    En,
    /// Turkish
    Tr,
}

impl Language {
    /// Name used when instructing the model.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Tr => "Turkish",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "tr" => Ok(Self::Tr),
            other => Err(format!("Unsupported language: {other}")),
        }
    }
}

/// Graft count for one scalp zone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraftZone {
    /// Zone name, eg "Frontal hairline".
    pub zone: String,
    /// Grafts estimated for this zone.
    pub count: u32,
}

/// Structured assessment of one scalp photo.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    /// Norwood stage, 1-7.
    pub norwood_scale: u8,
    /// Estimated total grafts.
    pub total_grafts: u32,
    /// Per-zone breakdown, in the order the model returned it.
    pub distribution: Vec<GraftZone>,
    /// Low end of the cost estimate.
    pub estimated_cost_min: u32,
    /// High end of the cost estimate.
    pub estimated_cost_max: u32,
    /// Free-text summary in the requested language.
    pub summary: String,
}

/// Why a parsed assessment can't be used.
#[derive(Debug, PartialEq, Eq)]
pub enum AssessmentError {
    /// The text isn't JSON of the expected shape.
    Malformed(String),
    /// Norwood stage outside 1-7.
    NorwoodOutOfRange(u8),
    /// `estimatedCostMax` is below `estimatedCostMin`.
    InvertedCostRange {
        /// low end
        min: u32,
        /// high end
        max: u32,
    },
}

impl std::fmt::Display for AssessmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "Malformed assessment JSON: {err}"),
            Self::NorwoodOutOfRange(value) => {
                write!(f, "Norwood scale {value} is outside 1-7")
            }
            Self::InvertedCostRange { min, max } => {
                write!(f, "Cost range is inverted: min {min} > max {max}")
            }
        }
    }
}

impl std::error::Error for AssessmentError {}

impl AssessmentResult {
    /// Parses and validates the model's JSON text.
    pub fn from_model_text(text: &str) -> Result<Self, AssessmentError> {
        let parsed: Self = serde_json::from_str(strip_code_fence(text))
            .map_err(|err| AssessmentError::Malformed(err.to_string()))?;
        parsed.validate()?;
        if let Some(drift) = parsed.distribution_drift()
            && drift > GRAFT_DISTRIBUTION_TOLERANCE
        {
            warn!(
                "Graft distribution sums to {} but total is {} ({:.0}% drift)",
                parsed.distribution_total(),
                parsed.total_grafts,
                drift * 100.0
            );
        }
        Ok(parsed)
    }

    /// Checks the hard invariants.
    pub fn validate(&self) -> Result<(), AssessmentError> {
        if !(1..=7).contains(&self.norwood_scale) {
            return Err(AssessmentError::NorwoodOutOfRange(self.norwood_scale));
        }
        if self.estimated_cost_max < self.estimated_cost_min {
            return Err(AssessmentError::InvertedCostRange {
                min: self.estimated_cost_min,
                max: self.estimated_cost_max,
            });
        }
        Ok(())
    }

    /// Sum of the per-zone counts.
    pub fn distribution_total(&self) -> u64 {
        self.distribution.iter().map(|zone| u64::from(zone.count)).sum()
    }

    /// Relative gap between the zone sum and `total_grafts`, `None` when there's nothing to compare.
    pub fn distribution_drift(&self) -> Option<f64> {
        if self.total_grafts == 0 || self.distribution.is_empty() {
            return None;
        }
        let total = f64::from(self.total_grafts);
        Some((self.distribution_total() as f64 - total).abs() / total)
    }
}

/// Response schema handed to the model for structured output.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "norwoodScale": {"type": "INTEGER", "description": "Norwood stage from 1 to 7"},
            "totalGrafts": {"type": "INTEGER"},
            "distribution": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "zone": {"type": "STRING"},
                        "count": {"type": "INTEGER"}
                    },
                    "required": ["zone", "count"]
                }
            },
            "estimatedCostMin": {"type": "INTEGER"},
            "estimatedCostMax": {"type": "INTEGER"},
            "summary": {"type": "STRING"}
        },
        "required": [
            "norwoodScale",
            "totalGrafts",
            "distribution",
            "estimatedCostMin",
            "estimatedCostMax",
            "summary"
        ],
        "propertyOrdering": [
            "norwoodScale",
            "totalGrafts",
            "distribution",
            "estimatedCostMin",
            "estimatedCostMax",
            "summary"
        ]
    })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
