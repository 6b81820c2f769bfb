//! The provider seam: one trait per backend, plus a registry keyed by id.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::document::Document;
use crate::types::{ExtractionResult, ProviderId};

/// Failure of a single provider call, classified for the retry controller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Worth retrying: network failure, timeout, rate limit, 5xx.
    #[error("{provider}: transient failure: {message}")]
    Transient {
        /// Backend that failed.
        provider: ProviderId,
        /// Human-readable cause.
        message: String,
        /// Server-requested delay before the next attempt.
        retry_after: Option<Duration>,
    },
    /// Not worth retrying: bad credentials, rejected input, unparseable output.
    #[error("{provider}: permanent failure: {message}")]
    Permanent {
        /// Backend that failed.
        provider: ProviderId,
        /// Human-readable cause.
        message: String,
    },
}

impl ProviderError {
    /// Creates a transient error without a server delay hint.
    #[must_use]
    pub fn transient(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::Transient {
            provider,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Creates a permanent error.
    #[must_use]
    pub fn permanent(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::Permanent {
            provider,
            message: message.into(),
        }
    }

    /// Transient error for a call that exceeded its per-attempt timeout.
    #[must_use]
    pub fn timeout(provider: ProviderId, after: Duration) -> Self {
        Self::transient(provider, format!("timed out after {after:?}"))
    }

    /// Attaches a server delay hint to a transient error; no-op otherwise.
    #[must_use]
    pub fn with_retry_after(mut self, delay: Option<Duration>) -> Self {
        if let Self::Transient { retry_after, .. } = &mut self {
            *retry_after = delay;
        }
        self
    }

    /// Whether the retry controller may try again.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Server-requested delay, if any.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Transient { retry_after, .. } => *retry_after,
            Self::Permanent { .. } => None,
        }
    }

    /// Backend the error came from.
    #[must_use]
    pub const fn provider(&self) -> &ProviderId {
        match self {
            Self::Transient { provider, .. } | Self::Permanent { provider, .. } => provider,
        }
    }
}

/// An extraction backend.
///
/// Implementations translate the backend's native output into the canonical
/// [`ExtractionResult`] and classify every failure as transient or permanent.
/// A single call must not retry on its own; retries belong to the orchestrator.
#[async_trait]
pub trait DocumentProvider: Send + Sync {
    /// Stable identifier of this backend.
    fn id(&self) -> &ProviderId;

    /// Extracts the canonical result for `document`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transient`] for retryable failures and
    /// [`ProviderError::Permanent`] otherwise.
    async fn extract(&self, document: &Document) -> Result<ExtractionResult, ProviderError>;

    /// Time one attempt needs, for backends whose calls run longer than the
    /// policy's per-attempt timeout (submit-and-poll services).
    ///
    /// The orchestrator uses the longer of this and the policy timeout.
    fn attempt_timeout(&self) -> Option<Duration> {
        None
    }
}

/// Registered providers keyed by id.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Arc<dyn DocumentProvider>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider` under its own id, replacing any previous entry.
    pub fn register(&mut self, provider: Arc<dyn DocumentProvider>) {
        let id = provider.id().clone();
        tracing::debug!(provider = %id, "Registered provider");
        self.providers.insert(id, provider);
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, provider: Arc<dyn DocumentProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Looks up a provider.
    #[must_use]
    pub fn get(&self, id: &ProviderId) -> Option<Arc<dyn DocumentProvider>> {
        self.providers.get(id).cloned()
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &ProviderId) -> bool {
        self.providers.contains_key(id)
    }

    /// Registered ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<ProviderId> {
        let mut ids: Vec<_> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Static(ProviderId);

    #[async_trait]
    impl DocumentProvider for Static {
        fn id(&self) -> &ProviderId {
            &self.0
        }

        async fn extract(&self, _document: &Document) -> Result<ExtractionResult, ProviderError> {
            Ok(ExtractionResult::new(self.0.clone()))
        }
    }

    #[test]
    fn test_error_classification() {
        let err = ProviderError::transient(ProviderId::openai(), "429")
            .with_retry_after(Some(Duration::from_secs(2)));
        assert!(err.is_transient());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));

        let err = ProviderError::permanent(ProviderId::openai(), "401")
            .with_retry_after(Some(Duration::from_secs(2)));
        assert!(!err.is_transient());
        assert_eq!(err.retry_after(), None);
        assert_eq!(err.provider(), &ProviderId::openai());
    }

    #[tokio::test]
    async fn test_registry_lookup() {
        let registry = ProviderRegistry::new()
            .with(Arc::new(Static(ProviderId::gemini())))
            .with(Arc::new(Static(ProviderId::mistral())));

        assert_eq!(registry.ids(), vec![ProviderId::gemini(), ProviderId::mistral()]);
        assert!(!registry.contains(&ProviderId::openai()));

        let doc = Document::from_bytes(b"%PDF-1.4".to_vec()).unwrap();
        let provider = registry.get(&ProviderId::gemini()).unwrap();
        let result = provider.extract(&doc).await.unwrap();
        assert_eq!(result.provider, ProviderId::gemini());
    }
}
