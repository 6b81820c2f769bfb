//! Rust client for the Document Intelligence layout analysis REST API.
//!
//! Submits a PDF for analysis, polls the long-running operation and returns
//! the typed layout result (paragraph roles, tables, detected languages).

/// Submit-and-poll HTTP client.
pub mod client;
/// Endpoint, credentials and polling settings.
pub mod config;
/// Error types and HTTP status classification.
pub mod error;
/// Request and response wire types.
pub mod types;

pub use client::DocIntelClient;
pub use config::DocIntelConfig;
pub use error::DocIntelError;
pub use types::{AnalyzeResult, Paragraph, ParagraphRole, TableData};
