//! Per-run configuration of the extraction pipeline.

use std::time::Duration;

use crate::quality::QualityConfig;
use crate::reconcile::ReconcilePolicy;
use crate::retry::RetryPolicy;
use crate::types::ProviderId;
use crate::validation::ComparisonConfig;

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Provider whose output is the default source of truth
    /// (default: Document Intelligence-class).
    pub primary_provider: ProviderId,
    /// Validators in configuration order, without duplicates.
    pub validators: Vec<ProviderId>,
    /// Whether validators run at all (default: true).
    pub cross_validation_enabled: bool,
    /// Validator whose disagreement is authoritative.
    pub validation_provider: Option<ProviderId>,
    /// Retry behavior for every provider call.
    pub retry: RetryPolicy,
    /// Comparison tolerances.
    pub comparison: ComparisonConfig,
    /// Quality detectors run on the primary result.
    pub quality: QualityConfig,
    /// Confidence thresholds for reconciliation (default: 0.95 / 0.5).
    pub validated_threshold: f64,
    /// See [`validated_threshold`](Self::validated_threshold).
    pub low_confidence_threshold: f64,
    /// Runs slower than this log a warning (default: 30s).
    pub slow_run_warning: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            primary_provider: ProviderId::document_intelligence(),
            validators: Vec::new(),
            cross_validation_enabled: true,
            validation_provider: None,
            retry: RetryPolicy::default(),
            comparison: ComparisonConfig::default(),
            quality: QualityConfig::default(),
            validated_threshold: 0.95,
            low_confidence_threshold: 0.5,
            slow_run_warning: Duration::from_secs(30),
        }
    }
}

impl OrchestratorConfig {
    /// Config with the given primary and defaults elsewhere.
    #[must_use]
    pub fn new(primary_provider: ProviderId) -> Self {
        Self {
            primary_provider,
            ..Self::default()
        }
    }

    /// Set the primary provider.
    #[must_use]
    pub fn with_primary(mut self, provider: ProviderId) -> Self {
        self.primary_provider = provider;
        self
    }

    /// Appends a validator unless already present.
    #[must_use]
    pub fn with_validator(mut self, provider: ProviderId) -> Self {
        if !self.validators.contains(&provider) {
            self.validators.push(provider);
        }
        self
    }

    /// Replaces the validator list, keeping first occurrences only.
    #[must_use]
    pub fn with_validators<I>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = ProviderId>,
    {
        self.validators.clear();
        providers.into_iter().fold(self, Self::with_validator)
    }

    /// Enable or disable cross-validation.
    #[must_use]
    pub const fn with_cross_validation(mut self, enabled: bool) -> Self {
        self.cross_validation_enabled = enabled;
        self
    }

    /// Set the authoritative validator.
    #[must_use]
    pub fn with_validation_provider(mut self, provider: Option<ProviderId>) -> Self {
        self.validation_provider = provider;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set comparison tolerances.
    #[must_use]
    pub fn with_comparison(mut self, comparison: ComparisonConfig) -> Self {
        self.comparison = comparison;
        self
    }

    /// Set the quality detectors.
    #[must_use]
    pub fn with_quality(mut self, quality: QualityConfig) -> Self {
        self.quality = quality;
        self
    }

    /// Set the slow-run warning threshold.
    #[must_use]
    pub const fn with_slow_run_warning(mut self, threshold: Duration) -> Self {
        self.slow_run_warning = threshold;
        self
    }

    /// Validators that actually run: none when cross-validation is off, and
    /// never the primary itself.
    #[must_use]
    pub fn active_validators(&self) -> Vec<ProviderId> {
        if !self.cross_validation_enabled {
            return Vec::new();
        }
        self.validators
            .iter()
            .filter(|v| **v != self.primary_provider)
            .cloned()
            .collect()
    }

    /// Reconciliation policy derived from this config.
    #[must_use]
    pub fn reconcile_policy(&self) -> ReconcilePolicy {
        ReconcilePolicy::default()
            .with_thresholds(self.validated_threshold, self.low_confidence_threshold)
            .with_validation_provider(self.validation_provider.clone())
    }
}
