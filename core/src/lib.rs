//! Multi-provider PDF extraction with cross-validation.
//!
//! A primary provider extracts a canonical [`ExtractionResult`](types::ExtractionResult)
//! from a PDF, validator providers extract the same document independently, and
//! the [`CrossValidator`](validation::CrossValidator) compares them field by field.
//! The [`Reconciler`](reconcile::Reconciler) turns the comparison into a
//! consolidated result with a validation status.
//!
//! Provider backends live in separate crates and plug in through the
//! [`DocumentProvider`](provider::DocumentProvider) trait.

pub mod document;
pub mod extraction;
pub mod provider;
pub mod quality;
pub mod reconcile;
pub mod retry;
pub mod types;
pub mod validation;

/// Common traits and types for ergonomic usage of the pipeline.
pub mod prelude {
    pub use crate::document::{Document, DocumentError, DocumentMetadata};
    pub use crate::extraction::{
        CallMetrics, ExtractionOrchestrator, OrchestratorConfig, OrchestratorError, RunMetrics,
    };
    pub use crate::provider::{DocumentProvider, ProviderError, ProviderRegistry};
    pub use crate::quality::{FindingTarget, QualityConfig, QualityDetector, QualityFinding};
    pub use crate::reconcile::{ConsolidatedResult, ReconcilePolicy, Reconciler, Status};
    pub use crate::retry::{RetryError, RetryPolicy};
    pub use crate::types::{
        ExtractionResult, FieldValue, OutlineNode, PageRange, ProviderId, Section, Table,
    };
    pub use crate::validation::{
        Agreement, ComparisonConfig, CrossValidator, FieldDiff, FieldPath, TextMethod,
        ValidationReport,
    };
}
