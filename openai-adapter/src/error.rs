use std::time::Duration;
use thiserror::Error;

/// Errors raised by the chat completions client.
#[derive(Debug, Error)]
pub enum OpenAiError {
    /// The client configuration was rejected before any request.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transport-level failure (connect, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the completions endpoint.
    #[error("Chat completions returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
        /// Server-requested delay from `Retry-After`.
        retry_after: Option<Duration>,
    },

    /// Output stopped early, usually on the token limit.
    #[error("Completion was cut off: finish_reason={0}")]
    Truncated(String),

    /// The first choice carried no content.
    #[error("Completion contained no text")]
    EmptyCompletion,

    /// The response body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl OpenAiError {
    /// Whether a retry may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => matches!(status, 408 | 429 | 500..=599),
            Self::InvalidConfig(_) | Self::Truncated(_) | Self::EmptyCompletion | Self::Decode(_) => false,
        }
    }

    /// Server-requested delay before retrying.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(crossdoc_core::retry::parse_retry_after);
        let body = response.text().await.unwrap_or_default();
        Self::Status {
            status,
            body,
            retry_after,
        }
    }
}
