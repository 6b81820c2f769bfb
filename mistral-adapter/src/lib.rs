//! Rust client for the Mistral Document AI OCR endpoint.
//!
//! Posts a PDF as a base64 `data:` URL and returns markdown per page. A
//! per-client rate limiter keeps requests a minimum interval apart.

/// Rate-limited HTTP client and settings.
pub mod client;
/// Error types and HTTP status classification.
pub mod error;
/// Request and response wire types.
pub mod types;

pub use client::{MistralClient, MistralConfig, RateLimiter};
pub use error::MistralError;
pub use types::{OcrPage, OcrResponse};
