use std::time::Duration;

use base64::Engine;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::MistralError;
use crate::types::{DocumentInput, OcrRequest, OcrResponse};

/// Settings for the OCR endpoint.
#[derive(Debug, Clone)]
pub struct MistralConfig {
    /// Full OCR endpoint URL.
    pub api_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Defaults to `mistral-document-ai-2505`.
    pub model: String,
    /// Minimum spacing between requests from one client. Defaults to 1 second.
    pub min_request_interval: Duration,
    /// Per-request timeout. Defaults to 180 seconds.
    pub timeout: Duration,
}

impl MistralConfig {
    /// Creates a config with default model and pacing.
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: "mistral-document-ai-2505".to_string(),
            min_request_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(180),
        }
    }

    /// Overrides the OCR model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the minimum spacing between requests.
    #[must_use]
    pub const fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Spaces requests at least `interval` apart.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter that allows one request per `interval`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Waits until a request may be sent and marks the slot as taken.
    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let ready = previous + self.interval;
            let now = Instant::now();
            if ready > now {
                tracing::debug!(wait_ms = (ready - now).as_millis(), "Rate limiting OCR request");
                tokio::time::sleep_until(ready).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Client for the OCR endpoint.
#[derive(Debug)]
pub struct MistralClient {
    config: MistralConfig,
    http: reqwest::Client,
    limiter: RateLimiter,
}

impl MistralClient {
    /// Builds a client.
    ///
    /// # Errors
    ///
    /// Returns `MistralError::InvalidConfig` for a bad URL or an empty key.
    pub fn new(config: MistralConfig) -> Result<Self, MistralError> {
        if !config.api_url.starts_with("http") {
            return Err(MistralError::InvalidConfig(format!("bad api url {:?}", config.api_url)));
        }
        if config.api_key.trim().is_empty() {
            return Err(MistralError::InvalidConfig("api key is empty".into()));
        }
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        let limiter = RateLimiter::new(config.min_request_interval);
        Ok(Self { config, http, limiter })
    }

    /// Settings the client was built with.
    #[must_use]
    pub const fn config(&self) -> &MistralConfig {
        &self.config
    }

    /// Runs OCR over a PDF and returns per-page markdown.
    pub async fn ocr(&self, pdf: &[u8]) -> Result<OcrResponse, MistralError> {
        let request = OcrRequest {
            model: self.config.model.clone(),
            document: DocumentInput::pdf(&base64::engine::general_purpose::STANDARD.encode(pdf)),
            include_image_base64: false,
        };

        self.limiter.acquire().await;
        tracing::info!(model = %self.config.model, bytes = pdf.len(), "Submitting OCR request");
        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
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
            tracing::warn!(status = status.as_u16(), "OCR request failed");
            return Err(MistralError::Status {
                status: status.as_u16(),
                body,
                retry_after,
            });
        }

        let text = response.text().await?;
        let parsed: OcrResponse = serde_json::from_str(&text).map_err(|e| MistralError::Decode(e.to_string()))?;
        if parsed.pages.is_empty() {
            return Err(MistralError::NoPages);
        }
        tracing::info!(pages = parsed.pages.len(), model = %parsed.model, "OCR completed");
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_no_wait_after_idle() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        limiter.acquire().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        let before = Instant::now();
        limiter.acquire().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_new_validates() {
        assert!(MistralClient::new(MistralConfig::new("ftp://x", "k")).is_err());
        assert!(MistralClient::new(MistralConfig::new("https://x/ocr", "")).is_err());
        let client = MistralClient::new(MistralConfig::new("https://x/ocr", "k").with_model("m")).unwrap();
        assert_eq!(client.config().model, "m");
    }
}
