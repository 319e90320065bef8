//! Pipeline and stage state definitions.
//!
//! `PipelineState` models the lifecycle of a single card moving through the
//! development pipeline. Each stage of that pipeline is additionally tracked
//! on its own via `StageState`, independent of the top-level state.
//! `EventType` names the cause of a transition and is recorded alongside it
//! in the audit history.

use serde::{Deserialize, Serialize};

/// Top-level state of the pipeline for one card.
///
/// `Completed` and `Aborted` are terminal: no outgoing transitions exist
/// from either. Exactly one pipeline state is active at a time; it is owned
/// and mutated exclusively by the `StateTransitionEngine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Initializing,
    Running,
    StageRunning,
    StageCompleted,
    StageFailed,
    StageRetrying,
    StageSkipped,
    Recovering,
    Degraded,
    Paused,
    RollingBack,
    Failed,
    Completed,
    Aborted,
    CircuitOpen,
}

impl PipelineState {
    /// Whether this state is absorbing (no outgoing transitions).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::StageRunning => "stage_running",
            Self::StageCompleted => "stage_completed",
            Self::StageFailed => "stage_failed",
            Self::StageRetrying => "stage_retrying",
            Self::StageSkipped => "stage_skipped",
            Self::Recovering => "recovering",
            Self::Degraded => "degraded",
            Self::Paused => "paused",
            Self::RollingBack => "rolling_back",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::CircuitOpen => "circuit_open",
        }
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-stage state, tracked separately from the pipeline state.
///
/// A stage reaches a terminal state at `Completed` or `Failed`; duration is
/// computed only on entry into one of those two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    Pending,
    Running,
    Completed,
    Failed,
    Retrying,
    Skipped,
    CircuitOpen,
}

impl StageState {
    /// Whether the stage has finished (successfully or not).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Retrying => "retrying",
            Self::Skipped => "skipped",
            Self::CircuitOpen => "circuit_open",
        }
    }
}

impl Default for StageState {
    fn default() -> Self {
        Self::Pending
    }
}

impl std::fmt::Display for StageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cause of a state transition, recorded in the audit history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PipelineStarted,
    Initialized,
    StageStarted,
    StageFinished,
    StageFailed,
    StageRetried,
    StageSkipped,
    RecoveryStarted,
    RecoverySucceeded,
    RecoveryFailed,
    RollbackStarted,
    RollbackCompleted,
    Paused,
    Resumed,
    CircuitOpened,
    CheckpointRestored,
    Degraded,
    PipelineCompleted,
    PipelineAborted,
    Manual,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PipelineStarted => "pipeline_started",
            Self::Initialized => "initialized",
            Self::StageStarted => "stage_started",
            Self::StageFinished => "stage_finished",
            Self::StageFailed => "stage_failed",
            Self::StageRetried => "stage_retried",
            Self::StageSkipped => "stage_skipped",
            Self::RecoveryStarted => "recovery_started",
            Self::RecoverySucceeded => "recovery_succeeded",
            Self::RecoveryFailed => "recovery_failed",
            Self::RollbackStarted => "rollback_started",
            Self::RollbackCompleted => "rollback_completed",
            Self::Paused => "paused",
            Self::Resumed => "resumed",
            Self::CircuitOpened => "circuit_opened",
            Self::CheckpointRestored => "checkpoint_restored",
            Self::Degraded => "degraded",
            Self::PipelineCompleted => "pipeline_completed",
            Self::PipelineAborted => "pipeline_aborted",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(PipelineState::Completed.is_terminal());
        assert!(PipelineState::Aborted.is_terminal());
        assert!(!PipelineState::Failed.is_terminal());
        assert!(!PipelineState::Idle.is_terminal());
    }

    #[test]
    fn test_stage_terminal_states() {
        assert!(StageState::Completed.is_terminal());
        assert!(StageState::Failed.is_terminal());
        assert!(!StageState::Retrying.is_terminal());
        assert!(!StageState::CircuitOpen.is_terminal());
    }

    #[test]
    fn test_state_serde_round_trip() {
        let json = serde_json::to_string(&PipelineState::RollingBack).unwrap();
        assert_eq!(json, "\"rolling_back\"");
        let back: PipelineState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PipelineState::RollingBack);
    }
}
