use std::time::Duration;

use base64::Engine;

use crate::error::GeminiError;
use crate::types::{Content, GenerateRequest, GenerateResponse, GenerationConfig};

/// Settings for the generateContent endpoint.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key sent as the `key` query parameter.
    pub api_key: String,
    /// Defaults to `gemini-2.5-flash`.
    pub model: String,
    /// Defaults to `https://generativelanguage.googleapis.com`.
    pub base_url: String,
    /// Sampling temperature. Defaults to 0.0.
    pub temperature: f32,
    /// Per-request timeout. Defaults to 120 seconds.
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Creates a config with default model and endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            temperature: 0.0,
            timeout: Duration::from_secs(120),
        }
    }

    /// Overrides the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endpoint without the key query parameter.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

/// Client for the generateContent API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

impl GeminiClient {
    /// Builds a client.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::InvalidConfig` for an empty key.
    pub fn new(config: GeminiConfig) -> Result<Self, GeminiError> {
        if config.api_key.trim().is_empty() {
            return Err(GeminiError::InvalidConfig("api key is empty".into()));
        }
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    /// Settings the client was built with.
    #[must_use]
    pub const fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Sends the PDF inline with the prompt and returns the generated markdown.
    ///
    /// The service takes a single prompt, so callers join system and user
    /// instructions before calling.
    pub async fn generate_markdown(&self, prompt: &str, pdf: &[u8]) -> Result<String, GeminiError> {
        let request = GenerateRequest {
            contents: vec![Content::user_with_pdf(
                prompt,
                base64::engine::general_purpose::STANDARD.encode(pdf),
            )],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: None,
            },
        };
        tracing::info!(model = %self.config.model, bytes = pdf.len(), "Requesting generateContent");

        let response = self
            .http
            .post(self.config.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(crossdoc_core::retry::parse_retry_after);
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "generateContent failed");
            return Err(GeminiError::Status {
                status: status.as_u16(),
                body,
                retry_after,
            });
        }

        let text = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&text).map_err(|e| GeminiError::Decode(e.to_string()))?;
        markdown_from(&parsed)
    }
}

/// Extracts the markdown from a response, rejecting blocked or empty output.
pub fn markdown_from(response: &GenerateResponse) -> Result<String, GeminiError> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.clone())
    {
        return Err(GeminiError::Blocked(reason));
    }
    let text = response.text().unwrap_or_default();
    let text = text.trim();
    if text.is_empty() {
        let reason = response
            .candidates
            .first()
            .and_then(|c| c.finish_reason.clone())
            .unwrap_or_else(|| "none".to_string());
        return Err(GeminiError::EmptyResponse(reason));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let config = GeminiConfig::new("k").with_model("gemini-2.0-pro").with_base_url("http://localhost:9/");
        assert_eq!(config.endpoint(), "http://localhost:9/v1beta/models/gemini-2.0-pro:generateContent");
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(GeminiClient::new(GeminiConfig::new(" ")), Err(GeminiError::InvalidConfig(_))));
    }

    #[test]
    fn test_markdown_from() {
        let ok: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[{"text":" # T "}]},"finishReason":"STOP"}]}"#)
                .unwrap();
        assert_eq!(markdown_from(&ok).unwrap(), "# T");

        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"OTHER"}}"#).unwrap();
        assert!(matches!(markdown_from(&blocked), Err(GeminiError::Blocked(r)) if r == "OTHER"));

        let empty: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"MAX_TOKENS"}]}"#).unwrap();
        assert!(matches!(markdown_from(&empty), Err(GeminiError::EmptyResponse(r)) if r == "MAX_TOKENS"));
    }
}
