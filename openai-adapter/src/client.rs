use base64::Engine;

use crate::config::OpenAiConfig;
use crate::error::OpenAiError;
use crate::types::{ChatRequest, ChatResponse, Message};

/// Client for one chat completions deployment.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    http: reqwest::Client,
}

/// Prompt pair sent with each document.
#[derive(Debug, Clone, Copy)]
pub struct Prompt<'a> {
    /// System message text.
    pub system: &'a str,
    /// User prompt sent with the file.
    pub user: &'a str,
}

impl OpenAiClient {
    /// # Errors
    ///
    /// Returns `OpenAiError::InvalidConfig` for missing credentials.
    pub fn new(config: OpenAiConfig) -> Result<Self, OpenAiError> {
        config.validate()?;
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    /// Settings the client was built with.
    #[must_use]
    pub const fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    /// Builds the request body for a PDF.
    #[must_use]
    pub fn request(&self, prompt: Prompt<'_>, pdf: &[u8]) -> ChatRequest {
        let encoded = base64::engine::general_purpose::STANDARD.encode(pdf);
        ChatRequest {
            messages: vec![
                Message::system(prompt.system),
                Message::user_with_pdf(prompt.user, "document.pdf", &encoded),
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }

    /// Sends the PDF and returns the model's markdown.
    pub async fn extract_markdown(&self, prompt: Prompt<'_>, pdf: &[u8]) -> Result<String, OpenAiError> {
        let body = self.request(prompt, pdf);
        tracing::info!(deployment = %self.config.deployment, bytes = pdf.len(), "Requesting chat completion");

        let response = self
            .http
            .post(self.config.completions_url())
            .header("api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            let err = OpenAiError::from_response(response).await;
            tracing::warn!(error = %err, "Chat completion failed");
            return Err(err);
        }

        let text = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| OpenAiError::Decode(e.to_string()))?;
        if let Some(usage) = parsed.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Token usage"
            );
        }
        markdown_from(parsed)
    }
}

/// Pulls the assistant text out of a response.
///
/// A `length` finish means the markdown is incomplete and is rejected.
pub fn markdown_from(response: ChatResponse) -> Result<String, OpenAiError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(OpenAiError::EmptyCompletion)?;
    if choice.finish_reason.as_deref() == Some("length") {
        return Err(OpenAiError::Truncated("length".into()));
    }
    let content = choice.message.content.unwrap_or_default();
    let content = content.trim();
    if content.is_empty() {
        return Err(OpenAiError::EmptyCompletion);
    }
    Ok(content.to_string())
}
