//! Error types for the recovery crate.

use thiserror::Error;

/// Result type alias for recovery operations.
pub type RecoveryResult<T> = Result<T, RecoveryError>;

/// Errors that can occur during recovery operations.
///
/// Expected failures of recovery actions are `Ok(false)` returns on the
/// handler contract, not errors. These variants cover wiring mistakes and
/// faults the handlers could not anticipate.
#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("Handler not found: {0}")]
    HandlerNotFound(String),

    #[error("Handler fault: {0}")]
    HandlerFault(String),

    #[error("Workflow generation failed: {0}")]
    GenerationFailed(String),

    #[error("State error: {0}")]
    State(#[from] artemis_core::StateError),
}
