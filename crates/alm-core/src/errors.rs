//! Cross-cutting error types for Almanac.
//!
//! Domain-specific errors (`ApiError`, `AnalyzeError`, `ExposureError`) live
//! in their own crates. These are the ones any crate can raise.

use thiserror::Error;

use crate::enums::JobStatus;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A state machine transition was attempted that is not allowed.
    #[error("Invalid job transition for {entity_key}: {from} -> {to}")]
    InvalidTransition {
        entity_key: String,
        from: JobStatus,
        to: JobStatus,
    },

    /// Data failed validation (format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),
}
