//! Error types for the supervisor crate.

use thiserror::Error;

/// Result type alias for supervisor operations.
pub type SupervisorResult<T> = Result<T, SupervisorError>;

/// Errors that can occur while assembling or driving the machine.
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Recovery error: {0}")]
    Recovery(#[from] artemis_recovery::RecoveryError),

    #[error("State error: {0}")]
    State(#[from] artemis_core::StateError),
}
