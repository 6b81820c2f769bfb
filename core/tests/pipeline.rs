use async_trait::async_trait;
use crossdoc_core::prelude::*;
use crossdoc_core::validation::ValidatorStatus;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted provider: pops one response per call, repeating the last one.
struct FakeProvider {
    id: ProviderId,
    script: Mutex<VecDeque<Result<ExtractionResult, ProviderError>>>,
    latency: Duration,
    budget: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl FakeProvider {
    fn new(id: ProviderId, response: Result<ExtractionResult, ProviderError>) -> Self {
        Self {
            id,
            script: Mutex::new(VecDeque::from([response])),
            latency: Duration::ZERO,
            budget: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn ok(result: ExtractionResult) -> Self {
        Self::new(result.provider.clone(), Ok(result))
    }

    fn then(self, response: Result<ExtractionResult, ProviderError>) -> Self {
        self.script.lock().unwrap().push_back(response);
        self
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl DocumentProvider for FakeProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn extract(&self, _document: &Document) -> Result<ExtractionResult, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        }
    }

    fn attempt_timeout(&self) -> Option<Duration> {
        self.budget
    }
}

fn document() -> Document {
    Document::from_bytes(b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n%%EOF".to_vec()).unwrap()
}

fn report(provider: ProviderId, title: &str, figure: f64) -> ExtractionResult {
    ExtractionResult::new(provider)
        .with_title(title)
        .with_figure("total", FieldValue::Number(figure))
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::default()
        .with_base_delay(Duration::from_millis(10))
        .with_jitter(false)
}

fn config(validators: &[ProviderId]) -> OrchestratorConfig {
    OrchestratorConfig::new(ProviderId::document_intelligence())
        .with_validators(validators.iter().cloned())
        .with_retry(fast_retry())
}

#[tokio::test(start_paused = true)]
async fn test_fuzzy_title_and_figure_are_validated() {
    let primary = FakeProvider::ok(report(ProviderId::document_intelligence(), "Report", 100.0));
    let validator = FakeProvider::ok(report(ProviderId::openai(), "report", 100.4));
    let orchestrator = ExtractionOrchestrator::new(
        ProviderRegistry::new()
            .with(Arc::new(primary))
            .with(Arc::new(validator)),
    );

    let out = orchestrator
        .run(&document(), &config(&[ProviderId::openai()]))
        .await
        .unwrap();

    assert_eq!(out.status, Status::Validated);
    assert_eq!(out.report.confidence, Some(1.0));
    assert!(out.report.diffs.iter().all(|d| d.agreement.is_agreement()));
    let figure = out
        .report
        .diffs
        .iter()
        .find(|d| d.path == FieldPath::Figure("total".into()))
        .unwrap();
    assert_eq!(figure.agreement, Agreement::FuzzyMatch);
    assert_eq!(out.result.title.as_deref(), Some("Report"));
}

#[tokio::test(start_paused = true)]
async fn test_large_difference_keeps_primary() {
    let primary = FakeProvider::ok(report(ProviderId::document_intelligence(), "Report", 100.0));
    let validator = FakeProvider::ok(report(ProviderId::openai(), "Report", 110.0));
    let orchestrator = ExtractionOrchestrator::new(
        ProviderRegistry::new()
            .with(Arc::new(primary))
            .with(Arc::new(validator)),
    );

    let out = orchestrator
        .run(&document(), &config(&[ProviderId::openai()]))
        .await
        .unwrap();

    assert_eq!(out.status, Status::ValidatedWithDiscrepancies);
    assert_eq!(out.result.figures["total"], FieldValue::Number(100.0));
    let mismatch: Vec<_> = out.report.disagreements().collect();
    assert_eq!(mismatch.len(), 1);
    assert_eq!(mismatch[0].agreement, Agreement::Mismatch);
    assert_eq!(mismatch[0].validator_value, Some(FieldValue::Number(110.0)));
}

#[tokio::test(start_paused = true)]
async fn test_permanent_primary_failure_skips_validators() {
    let primary = FakeProvider::new(
        ProviderId::document_intelligence(),
        Err(ProviderError::permanent(ProviderId::document_intelligence(), "401 unauthorized")),
    );
    let primary_calls = primary.counter();
    let validator = FakeProvider::ok(report(ProviderId::openai(), "Report", 1.0));
    let validator_calls = validator.counter();
    let orchestrator = ExtractionOrchestrator::new(
        ProviderRegistry::new()
            .with(Arc::new(primary))
            .with(Arc::new(validator)),
    );

    let err = orchestrator
        .run(&document(), &config(&[ProviderId::openai()]))
        .await
        .unwrap_err();

    match err {
        OrchestratorError::ExtractionFailed {
            attempts,
            retries_exhausted,
            ..
        } => {
            assert_eq!(attempts, 1);
            assert!(!retries_exhausted);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
    assert_eq!(validator_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_transient_primary_exhausts_retries() {
    let id = ProviderId::document_intelligence();
    let primary = FakeProvider::new(id.clone(), Err(ProviderError::transient(id, "503")));
    let calls = primary.counter();
    let validator = FakeProvider::ok(report(ProviderId::openai(), "Report", 1.0));
    let validator_calls = validator.counter();
    let orchestrator = ExtractionOrchestrator::new(
        ProviderRegistry::new()
            .with(Arc::new(primary))
            .with(Arc::new(validator)),
    );

    let err = orchestrator
        .run(&document(), &config(&[ProviderId::openai()]))
        .await
        .unwrap_err();

    assert!(err.retries_exhausted());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(validator_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_primary_recovers_after_transient_failure() {
    let id = ProviderId::document_intelligence();
    let primary = FakeProvider::new(id.clone(), Err(ProviderError::transient(id.clone(), "429")))
        .then(Ok(report(id, "Report", 5.0)));
    let orchestrator = ExtractionOrchestrator::new(ProviderRegistry::new().with(Arc::new(primary)));

    let out = orchestrator.run(&document(), &config(&[])).await.unwrap();

    assert_eq!(out.status, Status::Unvalidated);
    assert_eq!(out.metrics.unwrap().primary.attempts, 2);
}

#[tokio::test(start_paused = true)]
async fn test_long_running_primary_within_its_budget_is_not_cut_off() {
    let primary = FakeProvider::ok(report(ProviderId::document_intelligence(), "Report", 5.0))
        .with_latency(Duration::from_secs(90))
        .with_budget(Duration::from_secs(180));
    let calls = primary.counter();
    let orchestrator = ExtractionOrchestrator::new(ProviderRegistry::new().with(Arc::new(primary)));
    let config = config(&[]).with_retry(fast_retry().with_attempt_timeout(Duration::from_secs(60)));

    let out = orchestrator.run(&document(), &config).await.unwrap();

    assert_eq!(out.metrics.unwrap().primary.attempts, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_provider_budget_shorter_than_policy_is_ignored() {
    let primary = FakeProvider::ok(report(ProviderId::document_intelligence(), "Report", 5.0))
        .with_latency(Duration::from_secs(30))
        .with_budget(Duration::from_secs(10));
    let orchestrator = ExtractionOrchestrator::new(ProviderRegistry::new().with(Arc::new(primary)));
    let config = config(&[]).with_retry(fast_retry().with_attempt_timeout(Duration::from_secs(60)));

    let out = orchestrator.run(&document(), &config).await.unwrap();

    assert_eq!(out.metrics.unwrap().primary.attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn test_all_validators_failing_is_unvalidated() {
    let primary = FakeProvider::ok(report(ProviderId::document_intelligence(), "Report", 1.0));
    let openai = FakeProvider::new(
        ProviderId::openai(),
        Err(ProviderError::permanent(ProviderId::openai(), "403")),
    );
    let gemini = FakeProvider::new(
        ProviderId::gemini(),
        Err(ProviderError::transient(ProviderId::gemini(), "500")),
    );
    let gemini_calls = gemini.counter();
    let orchestrator = ExtractionOrchestrator::new(
        ProviderRegistry::new()
            .with(Arc::new(primary))
            .with(Arc::new(openai))
            .with(Arc::new(gemini)),
    );

    let out = orchestrator
        .run(&document(), &config(&[ProviderId::openai(), ProviderId::gemini()]))
        .await
        .unwrap();

    assert_eq!(out.status, Status::Unvalidated);
    assert!(out.report.insufficient_data);
    assert_eq!(out.report.confidence, None);
    assert_eq!(out.report.validators.len(), 2);
    assert!(out
        .report
        .validators
        .iter()
        .all(|v| matches!(v.status, ValidatorStatus::Unavailable { .. })));
    assert_eq!(gemini_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cross_validation_disabled_skips_validators() {
    let primary = FakeProvider::ok(report(ProviderId::document_intelligence(), "Report", 1.0));
    let validator = FakeProvider::ok(report(ProviderId::openai(), "Report", 1.0));
    let validator_calls = validator.counter();
    let orchestrator = ExtractionOrchestrator::new(
        ProviderRegistry::new()
            .with(Arc::new(primary))
            .with(Arc::new(validator)),
    );

    let out = orchestrator
        .run(
            &document(),
            &config(&[ProviderId::openai()]).with_cross_validation(false),
        )
        .await
        .unwrap();

    assert_eq!(out.status, Status::Unvalidated);
    assert!(out.report.diffs.is_empty());
    assert_eq!(validator_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_validators_run_concurrently_in_config_order() {
    let primary = FakeProvider::ok(report(ProviderId::document_intelligence(), "Report", 1.0));
    let slow = FakeProvider::ok(report(ProviderId::mistral(), "Report", 1.0)).with_latency(Duration::from_secs(10));
    let fast = FakeProvider::ok(report(ProviderId::gemini(), "Report", 1.0)).with_latency(Duration::from_secs(8));
    let orchestrator = ExtractionOrchestrator::new(
        ProviderRegistry::new()
            .with(Arc::new(primary))
            .with(Arc::new(slow))
            .with(Arc::new(fast)),
    );

    let start = tokio::time::Instant::now();
    let out = orchestrator
        .run(&document(), &config(&[ProviderId::mistral(), ProviderId::gemini()]))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_secs(10));
    assert!(elapsed < Duration::from_secs(18), "validators ran sequentially: {elapsed:?}");
    assert_eq!(out.status, Status::Validated);
    let order: Vec<_> = out.report.validators.iter().map(|v| v.provider.clone()).collect();
    assert_eq!(order, vec![ProviderId::mistral(), ProviderId::gemini()]);
    assert_eq!(out.report.diffs[0].validator, ProviderId::mistral());
    let metrics = out.metrics.unwrap();
    assert_eq!(metrics.validators[0].provider, ProviderId::mistral());
    assert_eq!(metrics.validators[1].provider, ProviderId::gemini());
}

#[tokio::test(start_paused = true)]
async fn test_hanging_validator_times_out_alone() {
    let primary = FakeProvider::ok(report(ProviderId::document_intelligence(), "Report", 1.0));
    let hanging =
        FakeProvider::ok(report(ProviderId::mistral(), "Report", 1.0)).with_latency(Duration::from_secs(3600));
    let healthy = FakeProvider::ok(report(ProviderId::openai(), "Report", 1.0));
    let orchestrator = ExtractionOrchestrator::new(
        ProviderRegistry::new()
            .with(Arc::new(primary))
            .with(Arc::new(hanging))
            .with(Arc::new(healthy)),
    );
    let retry = fast_retry()
        .with_max_attempts(1)
        .with_attempt_timeout(Duration::from_secs(5));

    let out = orchestrator
        .run(
            &document(),
            &config(&[ProviderId::mistral(), ProviderId::openai()]).with_retry(retry),
        )
        .await
        .unwrap();

    assert_eq!(out.status, Status::Validated);
    assert_eq!(out.report.compared_count(), 1);
    assert!(matches!(
        &out.report.validators[0].status,
        ValidatorStatus::Unavailable { reason } if reason.contains("timed out")
    ));
}

#[tokio::test(start_paused = true)]
async fn test_unregistered_validator_is_unavailable() {
    let primary = FakeProvider::ok(report(ProviderId::document_intelligence(), "Report", 1.0));
    let validator = FakeProvider::ok(report(ProviderId::openai(), "Report", 1.0));
    let orchestrator = ExtractionOrchestrator::new(
        ProviderRegistry::new()
            .with(Arc::new(primary))
            .with(Arc::new(validator)),
    );

    let out = orchestrator
        .run(&document(), &config(&[ProviderId::gemini(), ProviderId::openai()]))
        .await
        .unwrap();

    assert_eq!(out.status, Status::Validated);
    assert_eq!(
        out.report.validators[0].status,
        ValidatorStatus::Unavailable {
            reason: "provider not registered".into()
        }
    );
    assert_eq!(out.metrics.unwrap().validators[0].attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn test_unregistered_primary_is_an_error() {
    let orchestrator = ExtractionOrchestrator::new(ProviderRegistry::new());
    let err = orchestrator.run(&document(), &config(&[])).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::ProviderNotRegistered(_)));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_returns_no_partial_result() {
    let primary = FakeProvider::ok(report(ProviderId::document_intelligence(), "Report", 1.0));
    let validator =
        FakeProvider::ok(report(ProviderId::openai(), "Report", 1.0)).with_latency(Duration::from_secs(30));
    let orchestrator = ExtractionOrchestrator::new(
        ProviderRegistry::new()
            .with(Arc::new(primary))
            .with(Arc::new(validator)),
    );

    let err = orchestrator
        .run_until(
            &document(),
            &config(&[ProviderId::openai()]),
            tokio::time::sleep(Duration::from_secs(1)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn test_designated_validator_wins_over_primary() {
    let primary = ExtractionResult::new(ProviderId::document_intelligence())
        .with_title("Statement")
        .with_figure("opening", FieldValue::Number(10.0))
        .with_figure("closing", FieldValue::Number(20.0))
        .with_figure("fees", FieldValue::Number(3.0));
    let validator = ExtractionResult::new(ProviderId::gemini())
        .with_title("Statement")
        .with_figure("opening", FieldValue::Number(10.0))
        .with_figure("closing", FieldValue::Number(20.0))
        .with_figure("fees", FieldValue::Number(30.0));
    let orchestrator = ExtractionOrchestrator::new(
        ProviderRegistry::new()
            .with(Arc::new(FakeProvider::ok(primary)))
            .with(Arc::new(FakeProvider::ok(validator))),
    );

    let out = orchestrator
        .run(
            &document(),
            &config(&[ProviderId::gemini()]).with_validation_provider(Some(ProviderId::gemini())),
        )
        .await
        .unwrap();

    assert_eq!(out.status, Status::ValidatedWithDiscrepancies);
    assert!(!out.low_confidence);
    assert_eq!(out.result.figures["fees"], FieldValue::Number(30.0));
    assert_eq!(out.resolutions.len(), 1);
    assert_eq!(out.report.disagreements().count(), 1);
}
