//! Extraction pipeline orchestration.
//!
//! - [`ExtractionOrchestrator`] - primary call, concurrent validator fan-out, reconciliation
//! - [`OrchestratorError`] - failures that abort a run
//! - [`RunMetrics`] - attempts and timings per provider call
//! - [`OrchestratorConfig`] - per-run configuration

pub mod config;
pub mod error;
pub mod metrics;
pub mod orchestrator;

pub use config::OrchestratorConfig;
pub use error::OrchestratorError;
pub use metrics::{CallMetrics, RunMetrics};
pub use orchestrator::ExtractionOrchestrator;
