//! Core types for CropGuard

use serde::{Deserialize, Serialize};

/// Disease name reported to clients when the predicted class has no disease suffix
pub const HEALTHY_DISPLAY_NAME: &str = "Healthy";

/// A class label split into its crop and disease components
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedLabel {
    /// Crop name (label prefix)
    pub crop: String,

    /// Disease name (label suffix, may itself contain a variant); empty means healthy
    pub disease: String,
}

impl ParsedLabel {
    /// Create a parsed label from its parts
    pub fn new(crop: impl Into<String>, disease: impl Into<String>) -> Self {
        Self {
            crop: crop.into(),
            disease: disease.into(),
        }
    }

    /// True when the label carries no disease component
    pub fn is_healthy(&self) -> bool {
        self.disease.trim().is_empty()
    }
}

/// Structured treatment and prevention advice for a crop/disease pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryRecord {
    pub disease_description: String,
    pub symptoms: String,
    pub treatment_organic: String,
    pub treatment_chemical: String,
    pub preventive_measures: String,
}

impl AdvisoryRecord {
    /// True when every field carries text
    pub fn is_complete(&self) -> bool {
        [
            &self.disease_description,
            &self.symptoms,
            &self.treatment_organic,
            &self.treatment_chemical,
            &self.preventive_measures,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }
}

/// Which rule of the advisory lookup produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// No disease detected
    Healthy,
    /// Composite key found verbatim
    Exact,
    /// Composite key found after whitespace/underscore normalization
    Normalized,
    /// A table key contains both crop and disease names
    Partial,
    /// Generic advice, no curated entry
    Fallback,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Exact => "exact",
            Self::Normalized => "normalized",
            Self::Partial => "partial",
            Self::Fallback => "fallback",
        }
    }
}

/// One entry of a ranked prediction list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedClass {
    /// Class index in the model output
    pub index: usize,

    /// Class label
    pub label: String,

    /// Softmax probability (0.0-1.0)
    pub probability: f32,
}

/// Response record produced for every successful prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Full predicted class label
    pub predicted_class: String,

    /// Probability of the predicted class, rounded to 4 decimals
    pub confidence: f32,

    /// Crop component of the label
    pub crop_name: String,

    /// Disease component of the label, `"Healthy"` when absent
    pub disease_name: String,

    /// Treatment advice
    pub recommendation: AdvisoryRecord,

    /// Lookup rule that produced the recommendation
    pub advisory_source: MatchTier,

    /// Highest-probability classes, best first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_predictions: Vec<RankedClass>,
}

/// Round a confidence value to 4 decimal places
pub fn round_confidence(value: f32) -> f32 {
    (value * 10_000.0).round() / 10_000.0
}
