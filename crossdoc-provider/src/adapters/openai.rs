use async_trait::async_trait;

use crossdoc_core::document::Document;
use crossdoc_core::provider::{DocumentProvider, ProviderError};
use crossdoc_core::types::{ExtractionResult, ProviderId};
use crossdoc_openai::{OpenAiClient, Prompt};

use super::provider_error;
use crate::markdown;
use crate::prompts::Prompts;

/// Validator backed by an Azure-style chat completions deployment.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    id: ProviderId,
    client: OpenAiClient,
    prompts: Prompts,
}

impl OpenAiProvider {
    /// Wraps a completions client with the prompts to send.
    #[must_use]
    pub fn new(client: OpenAiClient, prompts: Prompts) -> Self {
        Self {
            id: ProviderId::openai(),
            client,
            prompts,
        }
    }
}

#[async_trait]
impl DocumentProvider for OpenAiProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn extract(&self, document: &Document) -> Result<ExtractionResult, ProviderError> {
        let prompt = Prompt {
            system: &self.prompts.system,
            user: &self.prompts.user,
        };
        let markdown = self
            .client
            .extract_markdown(prompt, document.bytes())
            .await
            .map_err(|e| provider_error(&self.id, &e))?;
        tracing::debug!(chars = markdown.len(), "Mapping completion markdown");
        Ok(markdown::parse(self.id.clone(), &markdown))
    }
}
