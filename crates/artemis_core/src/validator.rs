//! Legal transition table for the pipeline state graph.
//!
//! The graph is a static adjacency map from each state to its allowed
//! successors:
//!
//! ```text
//! Idle           → Initializing | Aborted
//! Initializing   → Running | Failed | Aborted
//! Running        → StageRunning | Paused | Degraded | Completed | Failed | Aborted
//! StageRunning   → StageCompleted | StageFailed | StageRetrying | StageSkipped | Paused | Aborted
//! StageCompleted → Running | StageRunning | Completed
//! StageFailed    → Recovering | StageRetrying | CircuitOpen | Failed
//! StageRetrying  → StageRunning | StageFailed | Failed
//! StageSkipped   → Running | StageRunning | Completed
//! Recovering     → Running | Degraded | RollingBack | Failed
//! Degraded       → Running | Recovering | Failed | Aborted
//! Paused         → Running | Aborted
//! RollingBack    → Running | StageRunning | Failed | Aborted
//! Failed         → Recovering | RollingBack | Aborted
//! CircuitOpen    → Running | StageSkipped | Degraded | Aborted
//! Completed      → ∅
//! Aborted        → ∅
//! ```

use crate::state::PipelineState;

/// Allowed successor states for `from`.
///
/// Terminal states map to the empty slice. Same-state transitions are not
/// listed here; `is_valid_transition` treats them as always valid.
pub fn allowed_transitions(from: PipelineState) -> &'static [PipelineState] {
    use PipelineState::*;
    match from {
        Idle => &[Initializing, Aborted],
        Initializing => &[Running, Failed, Aborted],
        Running => &[StageRunning, Paused, Degraded, Completed, Failed, Aborted],
        StageRunning => &[
            StageCompleted,
            StageFailed,
            StageRetrying,
            StageSkipped,
            Paused,
            Aborted,
        ],
        StageCompleted => &[Running, StageRunning, Completed],
        StageFailed => &[Recovering, StageRetrying, CircuitOpen, Failed],
        StageRetrying => &[StageRunning, StageFailed, Failed],
        StageSkipped => &[Running, StageRunning, Completed],
        Recovering => &[Running, Degraded, RollingBack, Failed],
        Degraded => &[Running, Recovering, Failed, Aborted],
        Paused => &[Running, Aborted],
        RollingBack => &[Running, StageRunning, Failed, Aborted],
        Failed => &[Recovering, RollingBack, Aborted],
        CircuitOpen => &[Running, StageSkipped, Degraded, Aborted],
        Completed | Aborted => &[],
    }
}

/// Whether `from → to` is a legal transition.
///
/// Same-state transitions are always valid so callers can re-assert the
/// current state as an idempotent no-op. Everything else is a membership
/// test against the adjacency map; unknown edges are simply absent, so the
/// function never errors.
pub fn is_valid_transition(from: PipelineState, to: PipelineState) -> bool {
    if from == to {
        return true;
    }
    allowed_transitions(from).contains(&to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PipelineState::*;

    #[test]
    fn test_idle_must_initialize_first() {
        assert!(!is_valid_transition(Idle, Running));
        assert!(is_valid_transition(Idle, Initializing));
        assert!(is_valid_transition(Initializing, Running));
    }

    #[test]
    fn test_stage_running_to_stage_completed() {
        assert!(is_valid_transition(StageRunning, StageCompleted));
    }

    #[test]
    fn test_same_state_always_valid() {
        for state in [Idle, Running, StageFailed, Completed, Aborted] {
            assert!(is_valid_transition(state, state));
        }
    }

    #[test]
    fn test_terminal_states_have_no_successors() {
        assert!(allowed_transitions(Completed).is_empty());
        assert!(allowed_transitions(Aborted).is_empty());
        assert!(!is_valid_transition(Completed, Running));
        assert!(!is_valid_transition(Aborted, Idle));
    }

    #[test]
    fn test_recovery_path_edges() {
        assert!(is_valid_transition(StageFailed, Recovering));
        assert!(is_valid_transition(Recovering, Running));
        assert!(is_valid_transition(Recovering, Failed));
        assert!(is_valid_transition(Failed, RollingBack));
        assert!(is_valid_transition(RollingBack, Running));
        assert!(is_valid_transition(RollingBack, Aborted));
    }

    #[test]
    fn test_no_shortcut_to_completed() {
        assert!(!is_valid_transition(Initializing, Completed));
        assert!(!is_valid_transition(StageFailed, Completed));
    }

    #[test]
    fn test_every_listed_successor_is_valid() {
        for from in [
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
            CircuitOpen,
        ] {
            for to in allowed_transitions(from) {
                assert!(is_valid_transition(from, *to), "{} → {}", from, to);
            }
        }
    }
}
