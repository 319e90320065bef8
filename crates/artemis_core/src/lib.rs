//! # artemis_core
//!
//! Pipeline state machine for the Artemis development pipeline.
//!
//! This crate provides the state graph, transition engine, per-stage state
//! tracking, rollback stack, and checkpoint persistence that keep a
//! long-running, failure-prone pipeline from corrupting itself on partial
//! failure.
//!
//! # Architecture
//!
//! - **States**: `PipelineState` for the pipeline, `StageState` per stage
//! - **Validator**: static adjacency map of legal transitions
//! - **Engine**: executes transitions, keeps the append-only audit history
//! - **Stages**: timing, retry, and metadata tracking per stage
//! - **Stack**: pushdown automaton of prior states for rollback
//! - **Checkpoints**: best-effort snapshot persistence for crash resume
//!
//! # Example
//!
//! ```rust
//! use artemis_core::{EventType, PipelineState, StateTransitionEngine};
//!
//! let mut engine = StateTransitionEngine::new();
//! assert!(engine.transition(PipelineState::Initializing, EventType::PipelineStarted));
//! assert!(engine.transition(PipelineState::Running, EventType::Initialized));
//!
//! // Illegal requests are refused, not raised: recovery is only reachable
//! // from a failure state.
//! assert!(!engine.transition(PipelineState::Recovering, EventType::RecoveryStarted));
//! assert_eq!(engine.current_state(), PipelineState::Running);
//! ```

pub mod checkpoint;
pub mod error;
pub mod events;
pub mod stack;
pub mod stage;
pub mod state;
pub mod transition;
pub mod validator;

// Re-export main types for convenience
pub use checkpoint::{
    CheckpointIntegration, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore,
    PipelineSnapshot, Progress, SnapshotStatus,
};
pub use error::{StateError, StateResult};
pub use events::{EventSink, MemoryEventSink, PipelineEvent};
pub use stack::StateStack;
pub use stage::{StageStateInfo, StageStateManager};
pub use state::{EventType, PipelineState, StageState};
pub use transition::{StateTransition, StateTransitionEngine, TransitionStats};
pub use validator::{allowed_transitions, is_valid_transition};
