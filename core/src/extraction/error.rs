//! Errors that fail a pipeline run.

use thiserror::Error;

use crate::document::DocumentError;
use crate::provider::ProviderError;
use crate::types::ProviderId;

/// Errors that can occur while running the pipeline.
///
/// Validator failures and low agreement are not errors; they show up in the
/// consolidated result.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The primary provider failed permanently or ran out of retries.
    #[error("Primary extraction with {provider} failed after {attempts} attempt(s): {source}")]
    ExtractionFailed {
        /// Primary provider.
        provider: ProviderId,
        /// Last error reported by the provider.
        #[source]
        source: ProviderError,
        /// Attempts made.
        attempts: u32,
        /// `true` when transient failures exhausted the retry budget.
        retries_exhausted: bool,
    },

    /// The caller cancelled the run.
    #[error("Extraction cancelled")]
    Cancelled,

    /// The configured primary is not registered.
    #[error("Provider not registered: {0}")]
    ProviderNotRegistered(ProviderId),

    /// The input document was rejected.
    #[error("Invalid document: {0}")]
    InvalidDocument(#[from] DocumentError),
}

impl OrchestratorError {
    /// Whether the failure came from transient errors.
    #[must_use]
    pub const fn retries_exhausted(&self) -> bool {
        matches!(
            self,
            Self::ExtractionFailed {
                retries_exhausted: true,
                ..
            }
        )
    }
}
