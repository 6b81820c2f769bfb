//! Submit-and-poll client for layout analysis.

use base64::Engine;
use reqwest::header::HeaderValue;

use crate::config::DocIntelConfig;
use crate::error::{parse_retry_after, DocIntelError};
use crate::types::{AnalyzeOperation, AnalyzeRequest, AnalyzeResult, OperationStatus};

const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OPERATION_LOCATION: &str = "Operation-Location";

/// Client for the layout analysis REST API.
#[derive(Debug, Clone)]
pub struct DocIntelClient {
    config: DocIntelConfig,
    http: reqwest::Client,
}

impl DocIntelClient {
    /// Builds a client with a pooled HTTP connection.
    ///
    /// # Errors
    ///
    /// Returns `DocIntelError::InvalidConfig` for a malformed endpoint or key
    /// and `DocIntelError::Http` if the HTTP client cannot be built.
    pub fn new(config: DocIntelConfig) -> Result<Self, DocIntelError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { config, http })
    }

    /// Settings the client was built with.
    #[must_use]
    pub const fn config(&self) -> &DocIntelConfig {
        &self.config
    }

    /// Analyzes a PDF and waits for the layout result.
    pub async fn analyze(&self, pdf: &[u8]) -> Result<AnalyzeResult, DocIntelError> {
        let location = self.submit(pdf).await?;
        self.poll(&location).await
    }

    async fn submit(&self, pdf: &[u8]) -> Result<String, DocIntelError> {
        let body = AnalyzeRequest {
            base64_source: base64::engine::general_purpose::STANDARD.encode(pdf),
        };
        tracing::info!(model = %self.config.model, bytes = pdf.len(), "Submitting layout analysis");

        let response = self
            .http
            .post(self.config.analyze_url())
            .header(KEY_HEADER, &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::ACCEPTED {
            return Err(status_error(response).await);
        }

        let location = response
            .headers()
            .get(OPERATION_LOCATION)
            .and_then(|v: &HeaderValue| v.to_str().ok())
            .map(str::to_string)
            .ok_or(DocIntelError::MissingOperationLocation)?;
        tracing::debug!(operation = %location, "Analysis accepted");
        Ok(location)
    }

    async fn poll(&self, location: &str) -> Result<AnalyzeResult, DocIntelError> {
        for attempt in 1..=self.config.max_polls {
            let response = self
                .http
                .get(location)
                .header(KEY_HEADER, &self.config.api_key)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(status_error(response).await);
            }

            let text = response.text().await?;
            let operation: AnalyzeOperation =
                serde_json::from_str(&text).map_err(|e| DocIntelError::Decode(e.to_string()))?;

            match operation.status {
                OperationStatus::Succeeded => {
                    tracing::info!(polls = attempt, "Layout analysis completed");
                    return operation.analyze_result.ok_or_else(|| {
                        DocIntelError::Decode("succeeded operation without analyzeResult".into())
                    });
                }
                OperationStatus::Failed | OperationStatus::Canceled => {
                    let reason = operation
                        .error
                        .map_or_else(|| format!("{:?}", operation.status), |e| e.to_string());
                    return Err(DocIntelError::AnalysisFailed(reason));
                }
                OperationStatus::NotStarted | OperationStatus::Running => {
                    tracing::debug!(attempt, max = self.config.max_polls, "Analysis in progress");
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
        Err(DocIntelError::PollTimeout {
            polls: self.config.max_polls,
        })
    }
}

async fn status_error(response: reqwest::Response) -> DocIntelError {
    let status = response.status().as_u16();
    let retry_after = parse_retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status, "Layout service returned an error status");
    DocIntelError::Status {
        status,
        body,
        retry_after,
    }
}
