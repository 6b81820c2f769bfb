//! Rust client for Azure-style OpenAI chat completions over PDF documents.
//!
//! The PDF is attached to the user message as a base64 `file` content part
//! and the model's reply is returned as markdown.

/// HTTP client.
pub mod client;
/// Deployment and credential settings.
pub mod config;
/// Error types and HTTP status classification.
pub mod error;
pub mod types;

pub use client::{markdown_from, OpenAiClient, Prompt};
pub use config::OpenAiConfig;
pub use error::OpenAiError;
