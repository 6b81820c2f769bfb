//! Process settings read once from the environment.
//!
//! [`Settings::from_env`] loads an optional `.env` file first. Every value has
//! a default; a value that is present but malformed is an error rather than
//! being silently replaced.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crossdoc_core::document::DocumentLimits;
use crossdoc_core::extraction::OrchestratorConfig;
use crossdoc_core::quality::QualityConfig;
use crossdoc_core::retry::RetryPolicy;
use crossdoc_core::types::ProviderId;
use crossdoc_core::validation::{ComparisonConfig, TextMethod};

use crate::prompts::Prompts;

/// Settings that cannot be used.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// A variable is present but malformed or out of range.
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        /// Environment variable name.
        key: &'static str,
        /// Raw value as found.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The configured primary cannot be registered.
    #[error("Primary provider {0} has no credentials configured")]
    PrimaryUnavailable(ProviderId),
}

/// Layout analysis credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocIntelSettings {
    /// Resource endpoint.
    pub endpoint: String,
    /// Subscription key.
    pub api_key: String,
    /// Model override.
    pub model: Option<String>,
}

/// Chat completions credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiSettings {
    /// Resource endpoint.
    pub endpoint: String,
    /// `api-key` header value.
    pub api_key: String,
    /// Deployment override.
    pub deployment: Option<String>,
    /// API version override.
    pub api_version: Option<String>,
    /// Extraction prompts.
    pub prompts: Prompts,
}

/// generateContent credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiSettings {
    /// API key.
    pub api_key: String,
    /// Model override.
    pub model: Option<String>,
    /// Extraction prompts.
    pub prompts: Prompts,
}

/// OCR credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MistralSettings {
    /// Full OCR endpoint URL.
    pub api_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Model override.
    pub model: Option<String>,
}

/// Everything the binary needs to build a registry and run the pipeline.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Provider whose result is the default source of truth.
    pub primary: ProviderId,
    /// Validators in configuration order.
    pub validators: Vec<ProviderId>,
    /// Whether validators run at all.
    pub cross_validation_enabled: bool,
    /// Validator whose disagreement overrides the primary.
    pub validation_provider: ProviderId,
    /// Comparison tolerances.
    pub comparison: ComparisonConfig,
    /// Enabled quality detectors.
    pub quality: QualityConfig,
    /// Retry behavior for every provider call.
    pub retry: RetryPolicy,
    /// Per-request timeout handed to each backend client.
    pub provider_timeout: Duration,
    /// Input size and page limits.
    pub limits: DocumentLimits,
    /// Runs slower than this log a warning.
    pub slow_run_warning: Duration,
    /// Layout analysis credentials, when configured.
    pub docintel: Option<DocIntelSettings>,
    /// Chat completions credentials, when configured.
    pub openai: Option<OpenAiSettings>,
    /// generateContent credentials, when configured.
    pub gemini: Option<GeminiSettings>,
    /// OCR credentials, when configured.
    pub mistral: Option<MistralSettings>,
}

impl Settings {
    /// Reads settings from the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, SettingsError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let primary = env
            .get("PRIMARY_PROVIDER")
            .map_or_else(ProviderId::document_intelligence, ProviderId::new);
        let validation_provider = env
            .get("VALIDATION_PROVIDER")
            .map_or_else(ProviderId::openai, ProviderId::new);
        let validators = env.get("VALIDATORS").map_or_else(
            || vec![validation_provider.clone()],
            |list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ProviderId::new)
                    .collect()
            },
        );

        let defaults = ComparisonConfig::default();
        let comparison = ComparisonConfig::default()
            .with_numeric_tolerance(env.parse("VALIDATION_NUMERIC_TOLERANCE", defaults.numeric_tolerance)?)
            .with_text_similarity_threshold(
                env.parse("VALIDATION_SIMILARITY_THRESHOLD", defaults.text_similarity_threshold)?,
            )
            .with_text_method(env.parse::<TextMethod>("VALIDATION_SIMILARITY_METHOD", defaults.text_method)?);
        check_fraction("VALIDATION_NUMERIC_TOLERANCE", comparison.numeric_tolerance)?;
        check_fraction("VALIDATION_SIMILARITY_THRESHOLD", comparison.text_similarity_threshold)?;

        let quality = match env.get("VALIDATION_PROBLEMS_ENABLED") {
            Some(list) => QualityConfig::parse_list(&list).map_err(|reason| SettingsError::Invalid {
                key: "VALIDATION_PROBLEMS_ENABLED",
                value: list.clone(),
                reason,
            })?,
            None => QualityConfig::default(),
        };

        let timeout_secs: u64 = env.parse("PROVIDER_TIMEOUT_SECS", 60)?;
        let attempts: u32 = env.parse("HTTP_RETRY_ATTEMPTS", 3)?;
        if attempts == 0 {
            return Err(invalid("HTTP_RETRY_ATTEMPTS", "0", "must be at least 1"));
        }
        let backoff_ms: u64 = env.parse("HTTP_RETRY_BACKOFF_MS", 500)?;
        let provider_timeout = Duration::from_secs(timeout_secs);
        let retry = RetryPolicy::default()
            .with_max_attempts(attempts)
            .with_base_delay(Duration::from_millis(backoff_ms))
            .with_attempt_timeout(provider_timeout);

        let limit_defaults = DocumentLimits::default();
        let max_upload_mb: usize = env.parse("MAX_UPLOAD_MB", limit_defaults.max_bytes / (1024 * 1024))?;
        let limits = DocumentLimits {
            max_bytes: max_upload_mb.saturating_mul(1024 * 1024),
            max_pages: env.parse("MAX_PDF_PAGES", limit_defaults.max_pages)?,
        };

        let docintel = match (
            env.get("AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT"),
            env.get("AZURE_DOCUMENT_INTELLIGENCE_KEY"),
        ) {
            (Some(endpoint), Some(api_key)) => Some(DocIntelSettings {
                endpoint,
                api_key,
                model: env.get("AZURE_DOCUMENT_INTELLIGENCE_MODEL"),
            }),
            _ => None,
        };
        let openai = match (env.get("AZURE_OPENAI_ENDPOINT"), env.get("AZURE_OPENAI_API_KEY")) {
            (Some(endpoint), Some(api_key)) => Some(OpenAiSettings {
                endpoint,
                api_key,
                deployment: env.get("AZURE_OPENAI_DEPLOYMENT"),
                api_version: env.get("AZURE_OPENAI_API_VERSION"),
                prompts: Prompts::with_overrides(
                    env.get("OPENAI_SYSTEM_PROMPT"),
                    env.get("OPENAI_USER_PROMPT_TEMPLATE"),
                ),
            }),
            _ => None,
        };
        let gemini = env.get("GEMINI_API_KEY").map(|api_key| GeminiSettings {
            api_key,
            model: env.get("GEMINI_MODEL"),
            prompts: Prompts::with_overrides(env.get("GEMINI_SYSTEM_PROMPT"), env.get("GEMINI_USER_PROMPT_TEMPLATE")),
        });
        let mistral = match (env.get("MISTRAL_API_URL"), env.get("AZURE_API_KEY")) {
            (Some(api_url), Some(api_key)) => Some(MistralSettings {
                api_url,
                api_key,
                model: env.get("MISTRAL_MODEL"),
            }),
            _ => None,
        };

        Ok(Self {
            primary,
            validators,
            cross_validation_enabled: env.parse_bool("ENABLE_CROSS_VALIDATION", true)?,
            validation_provider,
            comparison,
            quality,
            retry,
            provider_timeout,
            limits,
            slow_run_warning: Duration::from_millis(env.parse("RESPONSE_TIME_WARNING_THRESHOLD_MS", 30_000)?),
            docintel,
            openai,
            gemini,
            mistral,
        })
    }

    /// Providers that have credentials configured.
    #[must_use]
    pub fn configured(&self) -> Vec<ProviderId> {
        let mut ids = Vec::new();
        if self.docintel.is_some() {
            ids.push(ProviderId::document_intelligence());
        }
        if self.openai.is_some() {
            ids.push(ProviderId::openai());
        }
        if self.gemini.is_some() {
            ids.push(ProviderId::gemini());
        }
        if self.mistral.is_some() {
            ids.push(ProviderId::mistral());
        }
        ids
    }

    /// Pipeline configuration derived from these settings.
    #[must_use]
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::new(self.primary.clone())
            .with_validators(self.validators.iter().cloned())
            .with_cross_validation(self.cross_validation_enabled)
            .with_validation_provider(Some(self.validation_provider.clone()))
            .with_retry(self.retry.clone())
            .with_comparison(self.comparison.clone())
            .with_quality(self.quality.clone())
            .with_slow_run_warning(self.slow_run_warning)
    }
}

struct Env<'a, F>(&'a F);

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, SettingsError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw.parse().map_err(|e: T::Err| invalid(key, &raw, &e.to_string())),
            None => Ok(default),
        }
    }

    fn parse_bool(&self, key: &'static str, default: bool) -> Result<bool, SettingsError> {
        match self.get(key).map(|v| v.to_lowercase()) {
            None => Ok(default),
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
            Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
            Some(v) => Err(invalid(key, &v, "expected true or false")),
        }
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> SettingsError {
    SettingsError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn check_fraction(key: &'static str, value: f64) -> Result<(), SettingsError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(key, &value.to_string(), "must be between 0 and 1"))
    }
}
