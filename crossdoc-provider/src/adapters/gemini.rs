use async_trait::async_trait;

use crossdoc_core::document::Document;
use crossdoc_core::provider::{DocumentProvider, ProviderError};
use crossdoc_core::types::{ExtractionResult, ProviderId};
use crossdoc_gemini::GeminiClient;

use super::provider_error;
use crate::markdown;
use crate::prompts::Prompts;

/// Validator backed by Gemini `generateContent`.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    id: ProviderId,
    client: GeminiClient,
    prompt: String,
}

impl GeminiProvider {
    /// The service takes one prompt, so system and user prompts are joined here.
    #[must_use]
    pub fn new(client: GeminiClient, prompts: &Prompts) -> Self {
        Self {
            id: ProviderId::gemini(),
            client,
            prompt: prompts.combined(),
        }
    }
}

#[async_trait]
impl DocumentProvider for GeminiProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn extract(&self, document: &Document) -> Result<ExtractionResult, ProviderError> {
        let markdown = self
            .client
            .generate_markdown(&self.prompt, document.bytes())
            .await
            .map_err(|e| provider_error(&self.id, &e))?;
        Ok(markdown::parse(self.id.clone(), &markdown))
    }
}
