//! Error types for the state machine crate.

use thiserror::Error;

/// Result type alias for state machine operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during state machine operations.
///
/// Expected recovery-path outcomes (rejected transitions, failed actions)
/// are reported through boolean returns, not through this enum; these
/// variants cover I/O and serialization faults only.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Checkpoint store error: {0}")]
    Store(String),
}
