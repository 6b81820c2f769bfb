//! Turns a validation report into the consolidated result.
//!
//! Disagreement never fails a request: it is reported through the status, the
//! low-confidence flag and the retained diffs.

use serde::{Deserialize, Serialize};

use crate::extraction::RunMetrics;
use crate::types::{ExtractionResult, FieldValue, ProviderId};
use crate::validation::{FieldDiff, FieldPath, ValidationReport};

/// Outcome tag of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Validators agree with the primary.
    Validated,
    /// Validators ran and disagree on some fields.
    ValidatedWithDiscrepancies,
    /// No validator produced a result, or cross-validation was off.
    Unvalidated,
    /// The primary extraction failed.
    Failed,
}

/// Thresholds and authority for reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcilePolicy {
    /// Confidence at or above which a run is validated (default: 0.95).
    pub validated_threshold: f64,
    /// Confidence below which a run is flagged low-confidence (default: 0.5).
    pub low_confidence_threshold: f64,
    /// Validator whose disagreement overrides the primary.
    pub validation_provider: Option<ProviderId>,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            validated_threshold: 0.95,
            low_confidence_threshold: 0.5,
            validation_provider: None,
        }
    }
}

impl ReconcilePolicy {
    /// Set the designated validation provider.
    #[must_use]
    pub fn with_validation_provider(mut self, provider: Option<ProviderId>) -> Self {
        self.validation_provider = provider;
        self
    }

    /// Set both confidence thresholds.
    #[must_use]
    pub const fn with_thresholds(mut self, validated: f64, low_confidence: f64) -> Self {
        self.validated_threshold = validated;
        self.low_confidence_threshold = low_confidence;
        self
    }
}

/// A field whose value was taken from the designated validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Field location.
    pub path: FieldPath,
    /// Validator that supplied the value.
    pub source: ProviderId,
    /// Primary's value before the override.
    pub replaced: Option<FieldValue>,
    /// Value now in the result.
    pub value: FieldValue,
}

/// The only value returned across the system boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedResult {
    /// Outcome tag.
    pub status: Status,
    /// Set when validators ran but agreement is below the low-confidence threshold.
    pub low_confidence: bool,
    /// Final extraction.
    pub result: ExtractionResult,
    /// Full comparison, every disagreement included.
    pub report: ValidationReport,
    /// Fields overridden from the designated validator.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resolutions: Vec<Resolution>,
    /// Run metrics, attached by the orchestrator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<RunMetrics>,
    /// Failure description for [`Status::Failed`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConsolidatedResult {
    /// Result for a run whose primary could not be validated at all.
    #[must_use]
    pub const fn unvalidated(result: ExtractionResult, report: ValidationReport) -> Self {
        Self {
            status: Status::Unvalidated,
            low_confidence: false,
            result,
            report,
            resolutions: Vec::new(),
            metrics: None,
            error: None,
        }
    }

    /// Boundary representation of a failed run.
    #[must_use]
    pub fn failed(provider: ProviderId, error: impl Into<String>) -> Self {
        Self {
            status: Status::Failed,
            low_confidence: false,
            result: ExtractionResult::new(provider),
            report: ValidationReport::insufficient(),
            resolutions: Vec::new(),
            metrics: None,
            error: Some(error.into()),
        }
    }

    /// Attaches run metrics.
    #[must_use]
    pub fn with_metrics(mut self, metrics: RunMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// Applies a [`ReconcilePolicy`] to a primary result and its report.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    policy: ReconcilePolicy,
}

impl Reconciler {
    /// Creates a reconciler.
    #[must_use]
    pub const fn new(policy: ReconcilePolicy) -> Self {
        Self { policy }
    }

    /// Active policy.
    #[must_use]
    pub const fn policy(&self) -> &ReconcilePolicy {
        &self.policy
    }

    /// Produces the consolidated result.
    ///
    /// Pure: the same inputs always give an equal output.
    #[must_use]
    pub fn reconcile(&self, primary: &ExtractionResult, report: &ValidationReport) -> ConsolidatedResult {
        let mut consolidated = ConsolidatedResult::unvalidated(primary.clone(), report.clone());

        let confidence = match report.confidence {
            Some(c) if !report.insufficient_data && report.compared_count() > 0 => c,
            _ => return consolidated,
        };

        if confidence >= self.policy.validated_threshold && report.structural_mismatches() == 0 {
            consolidated.status = Status::Validated;
            return consolidated;
        }

        consolidated.status = Status::ValidatedWithDiscrepancies;
        if confidence < self.policy.low_confidence_threshold {
            consolidated.low_confidence = true;
            return consolidated;
        }

        if let Some(authority) = self.designated(report) {
            for diff in report.disagreements().filter(|d| &d.validator == authority) {
                if let Some(resolution) = apply(&mut consolidated.result, diff) {
                    consolidated.resolutions.push(resolution);
                }
            }
        }
        consolidated
    }

    fn designated<'a>(&'a self, report: &ValidationReport) -> Option<&'a ProviderId> {
        self.policy
            .validation_provider
            .as_ref()
            .filter(|id| report.compared(id))
    }
}

/// Writes the validator's value at `diff.path`, never deleting primary data.
fn apply(result: &mut ExtractionResult, diff: &FieldDiff) -> Option<Resolution> {
    let value = diff.validator_value.clone()?;
    let text = || value.to_string();

    match &diff.path {
        FieldPath::Title => result.title = Some(text()),
        FieldPath::SectionTitle(i) => result.sections.get_mut(*i)?.title = Some(text()),
        FieldPath::SectionText(i) => result.sections.get_mut(*i)?.text = Some(text()),
        FieldPath::TableCell { table, row, label } => {
            let row = result.tables.get_mut(*table)?.rows.get_mut(*row)?;
            row.insert(label.clone(), value.clone());
        }
        FieldPath::Figure(label) => {
            result.figures.insert(label.clone(), value.clone());
        }
        FieldPath::Outline { .. } => return None,
    }

    Some(Resolution {
        path: diff.path.clone(),
        source: diff.validator.clone(),
        replaced: diff.primary.clone(),
        value,
    })
}
