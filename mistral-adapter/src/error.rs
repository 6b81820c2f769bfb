use std::time::Duration;
use thiserror::Error;

/// Errors raised by the OCR client.
#[derive(Debug, Error)]
pub enum MistralError {
    /// The client configuration was rejected before any request.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transport-level failure (connect, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the OCR endpoint.
    #[error("OCR endpoint returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
        /// Server-requested delay from `Retry-After`.
        retry_after: Option<Duration>,
    },

    /// The OCR response had an empty page list.
    #[error("OCR response contained no pages")]
    NoPages,

    /// The response body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl MistralError {
    /// Whether a retry may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => matches!(status, 408 | 429 | 500..=599),
            Self::InvalidConfig(_) | Self::NoPages | Self::Decode(_) => false,
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
}
