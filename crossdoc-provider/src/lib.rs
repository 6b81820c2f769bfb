//! Concrete extraction backends and process wiring for the crossdoc pipeline.
//!
//! Each backend crate speaks its own wire protocol; this crate maps their
//! outputs onto the canonical [`ExtractionResult`](crossdoc_core::types::ExtractionResult),
//! reads [`Settings`](settings::Settings) from the environment and assembles the
//! [`ProviderRegistry`](crossdoc_core::provider::ProviderRegistry) the orchestrator runs on.

/// `DocumentProvider` implementations for each backend.
pub mod adapters;
/// Error types for wiring and running the pipeline.
pub mod errors;
/// Markdown to canonical result mapping.
pub mod markdown;
/// Default extraction prompts.
pub mod prompts;
/// Registry assembly from settings.
pub mod registry;
/// Environment-driven settings.
pub mod settings;
/// Shared table helpers.
pub mod tables;

pub use adapters::docintel::DocIntelProvider;
pub use adapters::gemini::GeminiProvider;
pub use adapters::mistral::MistralProvider;
pub use adapters::openai::OpenAiProvider;
pub use errors::Error;
pub use registry::build_registry;
pub use settings::{Settings, SettingsError};
