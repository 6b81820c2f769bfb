//! [`DocumentProvider`](crossdoc_core::provider::DocumentProvider) implementations
//! over the raw backend clients.

/// Layout analysis (primary).
pub mod docintel;
/// Gemini generateContent.
pub mod gemini;
/// Mistral OCR.
pub mod mistral;
/// Azure-style OpenAI chat completions.
pub mod openai;

use std::fmt::Display;
use std::time::Duration;

use crossdoc_core::provider::ProviderError;
use crossdoc_core::types::ProviderId;

/// Retry classification exposed by every backend error.
pub trait Classify: Display {
    /// Whether the orchestrator may retry the call.
    fn is_transient(&self) -> bool;
    /// Delay the service asked for, if any.
    fn retry_after(&self) -> Option<Duration>;
}

macro_rules! classify {
    ($($error:ty),* $(,)?) => {
        $(impl Classify for $error {
            fn is_transient(&self) -> bool {
                <$error>::is_transient(self)
            }
            fn retry_after(&self) -> Option<Duration> {
                <$error>::retry_after(self)
            }
        })*
    };
}

classify!(
    crossdoc_docintel::DocIntelError,
    crossdoc_openai::OpenAiError,
    crossdoc_gemini::GeminiError,
    crossdoc_mistral::MistralError,
);

/// Converts a backend error into the pipeline's transient/permanent split.
pub fn provider_error<E: Classify>(provider: &ProviderId, error: &E) -> ProviderError {
    if error.is_transient() {
        ProviderError::transient(provider.clone(), error.to_string()).with_retry_after(error.retry_after())
    } else {
        ProviderError::permanent(provider.clone(), error.to_string())
    }
}
