use std::time::Duration;
use thiserror::Error;

/// Errors raised by the layout analysis client.
#[derive(Debug, Error)]
pub enum DocIntelError {
    /// The client configuration was rejected before any request.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transport-level failure (connect, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the submit or poll request.
    #[error("Service returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
        /// Server-requested delay from `Retry-After`.
        retry_after: Option<Duration>,
    },

    /// A 202 response without the operation URL to poll.
    #[error("Analyze request accepted without an Operation-Location header")]
    MissingOperationLocation,

    /// The service reported the analysis as failed or canceled.
    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    /// Polling budget exhausted while the analysis was still running.
    #[error("Analysis still running after {polls} polls")]
    PollTimeout {
        /// Polls made.
        polls: u32,
    },

    /// The response body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl DocIntelError {
    /// Whether retrying the whole analysis may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => is_transient_status(*status),
            Self::PollTimeout { .. } => true,
            Self::InvalidConfig(_)
            | Self::MissingOperationLocation
            | Self::AnalysisFailed(_)
            | Self::Decode(_) => false,
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

/// 408, 429 and 5xx are worth retrying.
#[must_use]
pub const fn is_transient_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500..=599)
}

/// Reads the `Retry-After` header as delta-seconds.
#[must_use]
pub fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let raw = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?;
    crossdoc_core::retry::parse_retry_after(raw)
}
