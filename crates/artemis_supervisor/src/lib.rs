//! # artemis_supervisor
//!
//! Supervisor layer for the Artemis pipeline: per-stage circuit breakers
//! and the `ArtemisStateMachine` facade that composes the state machine,
//! stage tracking, checkpointing, and the recovery engine behind one
//! per-card API.
//!
//! # Example
//!
//! ```rust,ignore
//! use artemis_supervisor::{ArtemisStateMachine, MachineConfig, StageStart};
//!
//! let mut machine = ArtemisStateMachine::builder("card-42", environment)
//!     .config(MachineConfig::new().failure_threshold(3))
//!     .build()?;
//!
//! machine.start(Default::default());
//! match machine.begin_stage("development") {
//!     StageStart::Started => { /* run the stage, then complete_stage/fail_stage */ }
//!     StageStart::CircuitOpen => machine.skip_stage("development", "circuit open"),
//!     StageStart::Refused => { /* pipeline not in a runnable state */ }
//! }
//! ```

pub mod breaker;
pub mod config;
pub mod error;
pub mod machine;

// Re-export main types for convenience
pub use breaker::{CircuitBreakerManager, StageHealth};
pub use config::{MachineConfig, DEFAULT_STAGES};
pub use error::{SupervisorError, SupervisorResult};
pub use machine::{
    ArtemisStateMachine, ArtemisStateMachineBuilder, FailureResolution, StageStart,
};
