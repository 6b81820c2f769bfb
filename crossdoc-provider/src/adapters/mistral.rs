use std::sync::Arc;

use async_trait::async_trait;

use crossdoc_core::document::Document;
use crossdoc_core::provider::{DocumentProvider, ProviderError};
use crossdoc_core::types::{ExtractionResult, ProviderId};
use crossdoc_mistral::{MistralClient, OcrResponse};

use super::provider_error;
use crate::markdown::MarkdownMapper;

/// OCR-backed provider. Usable as primary or validator.
#[derive(Debug, Clone)]
pub struct MistralProvider {
    id: ProviderId,
    // Shared so clones keep one rate limiter.
    client: Arc<MistralClient>,
}

impl MistralProvider {
    /// Wraps an OCR client; its request pacing is shared by every clone of the provider.
    #[must_use]
    pub fn new(client: MistralClient) -> Self {
        Self {
            id: ProviderId::mistral(),
            client: Arc::new(client),
        }
    }
}

#[async_trait]
impl DocumentProvider for MistralProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn extract(&self, document: &Document) -> Result<ExtractionResult, ProviderError> {
        let response = self
            .client
            .ocr(document.bytes())
            .await
            .map_err(|e| provider_error(&self.id, &e))?;
        Ok(map_pages(self.id.clone(), &response))
    }
}

/// Concatenates page markdown in page order, numbering each page.
#[must_use]
pub fn map_pages(provider: ProviderId, response: &OcrResponse) -> ExtractionResult {
    let mut mapper = MarkdownMapper::new(provider);
    for page in response.ordered_pages() {
        mapper.push_page(page.number(), &page.markdown);
    }
    mapper.finish()
}
