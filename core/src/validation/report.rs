//! Field paths, per-field diffs and the aggregate validation report.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::quality::QualityFinding;
use crate::types::{FieldValue, ProviderId};

/// Location of a comparable field in the canonical schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldPath {
    /// `title`
    Title,
    /// `sections/{i}/title`
    SectionTitle(usize),
    /// `sections/{i}/text`
    SectionText(usize),
    /// `tables/{t}/rows/{r}/{label}`
    TableCell {
        /// Table index.
        table: usize,
        /// Row index.
        row: usize,
        /// Column label.
        label: String,
    },
    /// `figures/{label}`
    Figure(String),
    /// `outline/{normalized title}@{page}`
    Outline {
        /// Normalized node title.
        title: String,
        /// Target page, when known.
        page: Option<u32>,
    },
}

impl FieldPath {
    /// Whether the path addresses the outline tree.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(self, Self::Outline { .. })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title => f.write_str("title"),
            Self::SectionTitle(i) => write!(f, "sections/{i}/title"),
            Self::SectionText(i) => write!(f, "sections/{i}/text"),
            Self::TableCell { table, row, label } => write!(f, "tables/{table}/rows/{row}/{label}"),
            Self::Figure(label) => write!(f, "figures/{label}"),
            Self::Outline { title, page: Some(page) } => write!(f, "outline/{title}@{page}"),
            Self::Outline { title, page: None } => write!(f, "outline/{title}"),
        }
    }
}

impl FromStr for FieldPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid field path: {s}");
        if s == "title" {
            return Ok(Self::Title);
        }
        if let Some(label) = s.strip_prefix("figures/") {
            return Ok(Self::Figure(label.to_string()));
        }
        if let Some(rest) = s.strip_prefix("outline/") {
            let (title, page) = match rest.rsplit_once('@') {
                Some((title, page)) if page.parse::<u32>().is_ok() => (title, page.parse().ok()),
                _ => (rest, None),
            };
            return Ok(Self::Outline {
                title: title.to_string(),
                page,
            });
        }
        if let Some(rest) = s.strip_prefix("sections/") {
            let (index, field) = rest.split_once('/').ok_or_else(invalid)?;
            let index = index.parse().map_err(|_| invalid())?;
            return match field {
                "title" => Ok(Self::SectionTitle(index)),
                "text" => Ok(Self::SectionText(index)),
                _ => Err(invalid()),
            };
        }
        if let Some(rest) = s.strip_prefix("tables/") {
            let parts: Vec<&str> = rest.splitn(4, '/').collect();
            if let [table, "rows", row, label] = parts.as_slice() {
                return Ok(Self::TableCell {
                    table: table.parse().map_err(|_| invalid())?,
                    row: row.parse().map_err(|_| invalid())?,
                    label: (*label).to_string(),
                });
            }
        }
        Err(invalid())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Classification of one compared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Agreement {
    /// Equal after normalization.
    Exact,
    /// Within numeric tolerance or above the text similarity threshold.
    FuzzyMatch,
    /// Present on both sides and different.
    Mismatch,
    /// Present on one side only.
    MissingInOneSide,
}

impl Agreement {
    /// Exact and fuzzy matches count as agreement.
    #[must_use]
    pub const fn is_agreement(self) -> bool {
        matches!(self, Self::Exact | Self::FuzzyMatch)
    }
}

/// Comparison of one field between the primary and one validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDiff {
    /// Field location.
    pub path: FieldPath,
    /// Validator the primary was compared against.
    pub validator: ProviderId,
    /// Primary's value, `None` when absent.
    pub primary: Option<FieldValue>,
    /// Validator's value, `None` when absent.
    pub validator_value: Option<FieldValue>,
    /// Classification.
    pub agreement: Agreement,
    /// Similarity score for text comparisons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

/// What happened to one configured validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidatorStatus {
    /// The validator returned a result and was compared.
    Compared {
        /// Number of fields compared.
        fields: usize,
    },
    /// The validator failed or is not registered; excluded from scoring.
    Unavailable {
        /// Why the validator is missing.
        reason: String,
    },
}

/// A configured validator and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorOutcome {
    /// Validator id.
    pub provider: ProviderId,
    /// Outcome.
    #[serde(flatten)]
    pub status: ValidatorStatus,
}

/// Ordered diffs plus aggregate confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Diffs grouped by validator in configuration order.
    pub diffs: Vec<FieldDiff>,
    /// Fraction of agreeing fields, `None` when no validator succeeded.
    pub confidence: Option<f64>,
    /// Set when no validator produced a result.
    pub insufficient_data: bool,
    /// Every configured validator with its outcome.
    pub validators: Vec<ValidatorOutcome>,
    /// Quality problems found in the primary result.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<QualityFinding>,
}

impl ValidationReport {
    /// Report for a run where nothing was compared.
    #[must_use]
    pub const fn insufficient() -> Self {
        Self {
            diffs: Vec::new(),
            confidence: None,
            insufficient_data: true,
            validators: Vec::new(),
            problems: Vec::new(),
        }
    }

    /// Records a validator that produced no result.
    pub fn record_unavailable(&mut self, provider: ProviderId, reason: impl Into<String>) {
        self.validators.push(ValidatorOutcome {
            provider,
            status: ValidatorStatus::Unavailable { reason: reason.into() },
        });
    }

    /// Reorders validator outcomes to match `order`; unknown ids go last.
    pub fn sort_validators(&mut self, order: &[ProviderId]) {
        let rank = |id: &ProviderId| order.iter().position(|o| o == id).unwrap_or(usize::MAX);
        self.validators.sort_by_key(|v| rank(&v.provider));
    }

    /// Diffs that are not in agreement.
    pub fn disagreements(&self) -> impl Iterator<Item = &FieldDiff> {
        self.diffs.iter().filter(|d| !d.agreement.is_agreement())
    }

    /// Number of outline nodes that did not match.
    #[must_use]
    pub fn structural_mismatches(&self) -> usize {
        self.disagreements().filter(|d| d.path.is_structural()).count()
    }

    /// Whether `provider` returned a result that was compared.
    #[must_use]
    pub fn compared(&self, provider: &ProviderId) -> bool {
        self.validators
            .iter()
            .any(|v| &v.provider == provider && matches!(v.status, ValidatorStatus::Compared { .. }))
    }

    /// Number of validators that were compared.
    #[must_use]
    pub fn compared_count(&self) -> usize {
        self.validators
            .iter()
            .filter(|v| matches!(v.status, ValidatorStatus::Compared { .. }))
            .count()
    }
}
