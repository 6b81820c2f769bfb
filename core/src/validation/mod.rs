//! Cross-validation engine.
//!
//! Compares a primary [`ExtractionResult`](crate::types::ExtractionResult)
//! against validator results field by field and produces a
//! [`ValidationReport`] with a confidence score.

mod config;
mod engine;
pub mod normalize;
pub mod outline;
mod report;
pub mod similarity;

pub use config::{ComparisonConfig, TextMethod};
pub use engine::CrossValidator;
pub use report::{Agreement, FieldDiff, FieldPath, ValidationReport, ValidatorOutcome, ValidatorStatus};
