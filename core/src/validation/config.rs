//! Comparison settings for the cross-validation engine.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Similarity measure used for long text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMethod {
    /// Character edit distance over alphanumeric keys.
    #[default]
    Levenshtein,
    /// Cosine similarity of number frequencies.
    NumberFrequency,
}

impl FromStr for TextMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "levenshtein" => Ok(Self::Levenshtein),
            "number_frequency" => Ok(Self::NumberFrequency),
            other => Err(format!("unknown similarity method: {other}")),
        }
    }
}

/// Tolerances for field comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    /// Relative tolerance for numeric fields, inclusive (default: 0.005).
    pub numeric_tolerance: f64,
    /// Minimum similarity for long text to count as a fuzzy match (default: 0.9).
    pub text_similarity_threshold: f64,
    /// Similarity measure for long text (default: Levenshtein).
    pub text_method: TextMethod,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            numeric_tolerance: 0.005,
            text_similarity_threshold: 0.9,
            text_method: TextMethod::Levenshtein,
        }
    }
}

impl ComparisonConfig {
    /// Set the numeric tolerance.
    #[must_use]
    pub const fn with_numeric_tolerance(mut self, tolerance: f64) -> Self {
        self.numeric_tolerance = tolerance;
        self
    }

    /// Set the text similarity threshold.
    #[must_use]
    pub const fn with_text_similarity_threshold(mut self, threshold: f64) -> Self {
        self.text_similarity_threshold = threshold;
        self
    }

    /// Set the text similarity method.
    #[must_use]
    pub const fn with_text_method(mut self, method: TextMethod) -> Self {
        self.text_method = method;
        self
    }
}
