//! Error types shared across the pipeline.

use thiserror::Error;

/// Unknown lifecycle stage name.
#[derive(Debug, Clone, Error)]
#[error("unknown stage '{0}', expected IN_PROGRESS or RELEASED")]
pub struct ParseStageError(pub String);

/// A single source record could not be turned into a target document.
///
/// Recorded in the run's error report under `identifier`; never aborts the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to translate {identifier}: {message}")]
pub struct TranslationError {
    pub identifier: String,
    pub message: String,
}

impl TranslationError {
    pub fn new(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            message: message.into(),
        }
    }
}
