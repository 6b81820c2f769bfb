//! Rust client for the Gemini `generateContent` API.
//!
//! Sends a PDF as inline data with a single combined prompt and returns the
//! generated markdown.

/// HTTP client and settings.
pub mod client;
/// Error types and HTTP status classification.
pub mod error;
pub mod types;

pub use client::{markdown_from, GeminiClient, GeminiConfig};
pub use error::GeminiError;
