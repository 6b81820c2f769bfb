//! Drives one primary extraction and the concurrent validator fan-out.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::Instrument;

use super::config::OrchestratorConfig;
use super::error::OrchestratorError;
use super::metrics::{millis, CallMetrics, RunMetrics};
use crate::document::Document;
use crate::provider::{DocumentProvider, ProviderRegistry};
use crate::quality::QualityDetector;
use crate::reconcile::{ConsolidatedResult, Reconciler};
use crate::retry::{with_retry, Retried, RetryError, RetryPolicy};
use crate::types::{ExtractionResult, ProviderId};
use crate::validation::{CrossValidator, ValidationReport};

type CallOutcome = (Result<Retried<ExtractionResult>, RetryError>, Duration);

/// Runs the extraction pipeline against a registry of providers.
///
/// The orchestrator holds no per-request state; one instance can serve
/// concurrent runs.
#[derive(Debug, Clone)]
pub struct ExtractionOrchestrator {
    registry: ProviderRegistry,
}

impl ExtractionOrchestrator {
    /// Creates an orchestrator over `registry`.
    #[must_use]
    pub const fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    /// Registered providers.
    #[must_use]
    pub const fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Runs the pipeline to completion.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::ExtractionFailed`] when the primary fails and
    /// [`OrchestratorError::ProviderNotRegistered`] when it is unknown. Validator
    /// failures never fail the run.
    pub async fn run(
        &self,
        document: &Document,
        config: &OrchestratorConfig,
    ) -> Result<ConsolidatedResult, OrchestratorError> {
        self.run_until(document, config, std::future::pending::<()>()).await
    }

    /// Runs the pipeline until it completes or `cancelled` resolves.
    ///
    /// Cancellation drops every in-flight provider call and returns
    /// [`OrchestratorError::Cancelled`]; no partial result is produced.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run), plus [`OrchestratorError::Cancelled`].
    pub async fn run_until<C>(
        &self,
        document: &Document,
        config: &OrchestratorConfig,
        cancelled: C,
    ) -> Result<ConsolidatedResult, OrchestratorError>
    where
        C: Future<Output = ()>,
    {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!(
            "pipeline",
            request_id = %request_id,
            primary = %config.primary_provider
        );

        tokio::select! {
            biased;
            () = cancelled => {
                tracing::warn!(request_id = %request_id, "Extraction cancelled by caller");
                Err(OrchestratorError::Cancelled)
            }
            result = self.pipeline(document, config).instrument(span) => result,
        }
    }

    async fn pipeline(
        &self,
        document: &Document,
        config: &OrchestratorConfig,
    ) -> Result<ConsolidatedResult, OrchestratorError> {
        let start = Instant::now();
        let primary_id = &config.primary_provider;
        let primary = self
            .registry
            .get(primary_id)
            .ok_or_else(|| OrchestratorError::ProviderNotRegistered(primary_id.clone()))?;

        tracing::info!(bytes = document.len(), "Starting primary extraction");
        let (outcome, elapsed) = call(primary, document, &config.retry)
            .instrument(tracing::info_span!("provider_call", provider = %primary_id))
            .await;

        let primary_result = match outcome {
            Ok(retried) => retried,
            Err(failure) => {
                tracing::warn!(
                    attempts = failure.attempts,
                    retries_exhausted = failure.retries_exhausted,
                    "Primary extraction failed"
                );
                return Err(OrchestratorError::ExtractionFailed {
                    provider: primary_id.clone(),
                    source: failure.error,
                    attempts: failure.attempts,
                    retries_exhausted: failure.retries_exhausted,
                });
            }
        };
        let primary_metrics = CallMetrics::new(primary_id.clone(), primary_result.attempts, elapsed, true);
        let primary_result = primary_result.value;
        tracing::info!(
            sections = primary_result.sections.len(),
            tables = primary_result.tables.len(),
            figures = primary_result.figures.len(),
            elapsed_ms = millis(elapsed),
            "Primary extraction succeeded"
        );

        let problems = QualityDetector::new(config.quality.clone()).scan(&primary_result);
        let validators = config.active_validators();

        if validators.is_empty() {
            tracing::info!("Cross-validation skipped");
            let mut report = ValidationReport::insufficient();
            report.problems = problems;
            let metrics = RunMetrics {
                primary: primary_metrics,
                validators: Vec::new(),
                wall_time_ms: millis(start.elapsed()),
            };
            warn_if_slow(start, config);
            return Ok(ConsolidatedResult::unvalidated(primary_result, report).with_metrics(metrics));
        }

        let outcomes = self.fan_out(document, config, &validators).await;

        let mut successes = Vec::new();
        let mut unavailable = Vec::new();
        let mut validator_metrics = Vec::with_capacity(validators.len());
        for (id, outcome) in validators.iter().zip(outcomes) {
            match outcome {
                Some((Ok(retried), elapsed)) => {
                    validator_metrics.push(CallMetrics::new(id.clone(), retried.attempts, elapsed, true));
                    successes.push(retried.value);
                }
                Some((Err(failure), elapsed)) => {
                    tracing::warn!(validator = %id, error = %failure, "Validator unavailable");
                    validator_metrics.push(CallMetrics::new(id.clone(), failure.attempts, elapsed, false));
                    unavailable.push((id.clone(), failure.to_string()));
                }
                None => {
                    validator_metrics.push(CallMetrics::new(id.clone(), 0, Duration::ZERO, false));
                    let reason = if self.registry.contains(id) {
                        "validator task aborted"
                    } else {
                        "provider not registered"
                    };
                    tracing::warn!(validator = %id, reason, "Validator unavailable");
                    unavailable.push((id.clone(), reason.to_string()));
                }
            }
        }

        let mut report = CrossValidator::new(config.comparison.clone()).compare(&primary_result, &successes);
        for (id, reason) in unavailable {
            report.record_unavailable(id, reason);
        }
        report.sort_validators(&validators);
        report.problems = problems;

        let consolidated = Reconciler::new(config.reconcile_policy()).reconcile(&primary_result, &report);
        tracing::info!(
            status = ?consolidated.status,
            confidence = ?consolidated.report.confidence,
            compared = consolidated.report.compared_count(),
            discrepancies = consolidated.report.disagreements().count(),
            "Cross-validation finished"
        );

        let metrics = RunMetrics {
            primary: primary_metrics,
            validators: validator_metrics,
            wall_time_ms: millis(start.elapsed()),
        };
        warn_if_slow(start, config);
        Ok(consolidated.with_metrics(metrics))
    }

    /// Calls every registered validator concurrently.
    ///
    /// Returns one slot per validator in `validators` order; `None` marks a
    /// validator that never produced an outcome.
    async fn fan_out(
        &self,
        document: &Document,
        config: &OrchestratorConfig,
        validators: &[ProviderId],
    ) -> Vec<Option<CallOutcome>> {
        let mut slots: Vec<Option<CallOutcome>> = vec![None; validators.len()];
        let mut tasks = JoinSet::new();

        for (index, id) in validators.iter().enumerate() {
            let Some(provider) = self.registry.get(id) else {
                continue;
            };
            let document = document.clone();
            let policy = config.retry.clone();
            let span = tracing::info_span!("provider_call", provider = %id);
            tasks.spawn(
                async move {
                    let outcome = call(provider, &document, &policy).await;
                    (index, outcome)
                }
                .instrument(span),
            );
        }

        tracing::info!(validators = tasks.len(), "Validator fan-out started");
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => tracing::warn!(error = %e, "Validator task failed"),
            }
        }
        slots
    }
}

async fn call(provider: Arc<dyn DocumentProvider>, document: &Document, policy: &RetryPolicy) -> CallOutcome {
    let start = Instant::now();
    let id = provider.id().clone();
    let policy = effective_policy(provider.as_ref(), policy);
    let outcome = with_retry(&id, &policy, || provider.extract(document)).await;
    (outcome, start.elapsed())
}

/// `policy` with its attempt timeout stretched to what the provider needs.
fn effective_policy(provider: &dyn DocumentProvider, policy: &RetryPolicy) -> RetryPolicy {
    match provider.attempt_timeout() {
        Some(needed) if needed > policy.attempt_timeout => {
            tracing::debug!(
                provider = %provider.id(),
                timeout_ms = millis(needed),
                "Using provider attempt timeout"
            );
            policy.clone().with_attempt_timeout(needed)
        }
        _ => policy.clone(),
    }
}

fn warn_if_slow(start: Instant, config: &OrchestratorConfig) {
    let elapsed = start.elapsed();
    if elapsed > config.slow_run_warning {
        tracing::warn!(
            elapsed_ms = millis(elapsed),
            threshold_ms = millis(config.slow_run_warning),
            "Slow extraction run"
        );
    }
}
