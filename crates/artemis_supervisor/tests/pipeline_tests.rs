//! Integration tests for the full pipeline state machine.

use std::collections::HashMap;
use std::sync::Arc;

use artemis_core::{MemoryCheckpointStore, MemoryEventSink, PipelineState, StageState};
use artemis_recovery::mock::MockPorts;
use artemis_recovery::{FailureReport, IssueType};
use artemis_supervisor::{
    ArtemisStateMachine, FailureResolution, MachineConfig, StageStart,
};

fn three_stage_config() -> MachineConfig {
    MachineConfig::new().stages(["architecture", "development", "testing"])
}

/// Test a clean run: every stage completes and the pipeline finishes.
#[tokio::test]
async fn test_happy_path_run() {
    let ports = MockPorts::succeeding();
    let mut machine = ArtemisStateMachine::builder("card-1", MockPorts::environment(&ports))
        .config(three_stage_config())
        .build()
        .unwrap();

    assert!(machine.start(HashMap::new()));
    assert_eq!(machine.state(), PipelineState::Running);

    for stage in ["architecture", "development", "testing"] {
        assert_eq!(machine.begin_stage(stage), StageStart::Started);
        assert_eq!(machine.state(), PipelineState::StageRunning);
        assert!(machine.complete_stage(stage, serde_json::json!({"ok": true})));
        assert_eq!(machine.state(), PipelineState::Running);
    }

    assert!(machine.complete());
    assert_eq!(machine.state(), PipelineState::Completed);

    let progress = machine.progress();
    assert_eq!(progress.stages_completed, 3);
    assert!((progress.progress_percent - 100.0).abs() < f64::EPSILON);

    // Terminal means terminal.
    assert_eq!(machine.begin_stage("testing"), StageStart::Refused);
    assert!(!machine.abort("too late"));
}

/// Test that a failing stage recovers through the catalog and the stage
/// can be rerun to completion.
#[tokio::test]
async fn test_stage_failure_recovers_and_retries() {
    let ports = MockPorts::succeeding();
    let mut machine = ArtemisStateMachine::builder("card-2", MockPorts::environment(&ports))
        .config(three_stage_config())
        .build()
        .unwrap();

    machine.start(HashMap::new());
    assert_eq!(machine.begin_stage("development"), StageStart::Started);

    let report = FailureReport::new("ModuleNotFoundError: no module named 'requests'")
        .with_detail("package", serde_json::json!("requests"));
    let resolution = machine.fail_stage("development", report).await;

    let FailureResolution::Recovery(outcome) = resolution else {
        panic!("expected a recovery attempt");
    };
    assert_eq!(outcome.issue_type, Some(IssueType::MissingDependency));
    assert!(outcome.recovered);
    assert_eq!(machine.state(), PipelineState::Running);
    assert_eq!(ports.calls("install_package"), 1);

    // The stage is queued for retry and completes on the second run.
    assert_eq!(machine.stage("development").unwrap().retry_count, 1);
    assert_eq!(machine.begin_stage("development"), StageStart::Started);
    assert!(machine.complete_stage("development", serde_json::json!("fixed")));
}

/// Test the retry boundary end to end: a 3-retry action whose handler
/// always fails runs exactly four times, then the workflow fails.
#[tokio::test]
async fn test_exhausted_recovery_fails_pipeline() {
    let ports = MockPorts::failing();
    let mut machine = ArtemisStateMachine::builder("card-3", MockPorts::environment(&ports))
        .config(three_stage_config())
        .build()
        .unwrap();

    machine.start(HashMap::new());
    machine.begin_stage("development");

    let report = FailureReport::new("missing dependency detected")
        .with_detail("package", serde_json::json!("left-pad"));
    let resolution = machine.fail_stage("development", report).await;

    let FailureResolution::Recovery(outcome) = resolution else {
        panic!("expected a recovery attempt");
    };
    assert!(!outcome.recovered);
    assert_eq!(ports.calls("install_package"), 4); // initial + 3 retries
    assert_eq!(machine.state(), PipelineState::Failed);

    // Exhausted recovery leaves a non-terminal state: abort still works.
    assert!(machine.abort("recovery exhausted"));
    assert_eq!(machine.state(), PipelineState::Aborted);
}

/// Test that repeated failures open the circuit and begin_stage refuses.
#[tokio::test]
async fn test_circuit_breaker_blocks_failing_stage() {
    let ports = MockPorts::failing();
    let mut machine = ArtemisStateMachine::builder("card-4", MockPorts::environment(&ports))
        .config(three_stage_config().failure_threshold(2))
        .build()
        .unwrap();

    machine.start(HashMap::new());

    // First failure: recovery runs (and fails), pipeline lands in Failed.
    machine.begin_stage("testing");
    let first = machine
        .fail_stage("testing", FailureReport::new("tests failed: 3 assertions"))
        .await;
    assert!(matches!(first, FailureResolution::Recovery(_)));

    // Second failure trips the breaker before another recovery attempt.
    assert!(machine
        .history()
        .iter()
        .any(|t| t.to_state == PipelineState::Recovering));
    let runs_before = ports.calls("run_tests");

    let mut machine2 = ArtemisStateMachine::builder("card-4b", MockPorts::environment(&ports))
        .config(three_stage_config().failure_threshold(1))
        .build()
        .unwrap();
    machine2.start(HashMap::new());
    machine2.begin_stage("testing");
    let resolution = machine2
        .fail_stage("testing", FailureReport::new("tests failed: 3 assertions"))
        .await;
    assert!(matches!(resolution, FailureResolution::CircuitOpened));
    // No further recovery ran for the tripped stage.
    assert_eq!(ports.calls("run_tests"), runs_before);
    assert_eq!(machine2.state(), PipelineState::Running);
    assert_eq!(machine2.open_circuits(), vec!["testing"]);

    // Subsequent entry attempts are refused without touching the pipeline.
    assert_eq!(machine2.begin_stage("testing"), StageStart::CircuitOpen);
    assert_eq!(
        machine2.stage("testing").unwrap().state,
        StageState::CircuitOpen
    );
}

/// Test checkpoint resume across machine instances sharing one store.
#[tokio::test]
async fn test_resume_from_checkpoint_across_instances() {
    let ports = MockPorts::succeeding();
    let store = Arc::new(MemoryCheckpointStore::new());

    {
        let mut machine = ArtemisStateMachine::builder("card-5", MockPorts::environment(&ports))
            .config(three_stage_config())
            .checkpoint_store(store.clone())
            .build()
            .unwrap();

        machine.start(HashMap::new());
        machine.begin_stage("architecture");
        machine.complete_stage("architecture", serde_json::json!({"adrs": 2}));
        machine.begin_stage("development");
        // Crash here: the machine is dropped mid-stage.
    }

    let mut resumed = ArtemisStateMachine::builder("card-5", MockPorts::environment(&ports))
        .config(three_stage_config())
        .checkpoint_store(store)
        .build()
        .unwrap();

    assert!(resumed.can_resume());
    let snapshot = resumed.resume_from_checkpoint().unwrap();
    assert_eq!(snapshot.stages_completed, vec!["architecture"]);
    assert_eq!(snapshot.stage_results["architecture"], serde_json::json!({"adrs": 2}));
    assert_eq!(snapshot.total_stages, 3);

    // Resume does not transition; the caller replays the lifecycle and
    // skips completed stages.
    assert_eq!(resumed.state(), PipelineState::Idle);
    assert!(resumed.start(HashMap::new()));
    resumed.skip_stage("architecture", "already completed in checkpoint");
    assert_eq!(resumed.begin_stage("development"), StageStart::Started);
    assert!(resumed.complete_stage("development", serde_json::json!("done")));
    assert_eq!(resumed.begin_stage("testing"), StageStart::Started);
    assert!(resumed.complete_stage("testing", serde_json::json!("green")));
    assert!(resumed.complete());
}

/// Test that a configured checkpoint root wires up the file store and the
/// checkpoint survives on disk across machine instances.
#[tokio::test]
async fn test_checkpoint_root_config_persists_to_disk() {
    let ports = MockPorts::succeeding();
    let temp = tempfile::tempdir().unwrap();

    {
        let mut machine = ArtemisStateMachine::builder("card-10", MockPorts::environment(&ports))
            .config(three_stage_config().checkpoint_root(temp.path()))
            .build()
            .unwrap();

        machine.start(HashMap::new());
        machine.begin_stage("architecture");
        machine.complete_stage("architecture", serde_json::json!({"adrs": 1}));
    }

    assert!(temp
        .path()
        .join(".artemis/checkpoints/card-10.json")
        .exists());

    let mut resumed = ArtemisStateMachine::builder("card-10", MockPorts::environment(&ports))
        .config(three_stage_config().checkpoint_root(temp.path()))
        .build()
        .unwrap();
    assert!(resumed.can_resume());
    let snapshot = resumed.resume_from_checkpoint().unwrap();
    assert_eq!(snapshot.stages_completed, vec!["architecture"]);
}

/// Test a direct stage retry, without a recovery workflow in between.
#[tokio::test]
async fn test_retry_stage_reenters_running_stage() {
    let ports = MockPorts::succeeding();
    let mut machine = ArtemisStateMachine::builder("card-9", MockPorts::environment(&ports))
        .config(three_stage_config())
        .build()
        .unwrap();

    machine.start(HashMap::new());

    // No stage has started yet; there is nothing to retry.
    assert!(!machine.retry_stage("development"));

    assert_eq!(machine.begin_stage("development"), StageStart::Started);
    assert!(machine.retry_stage("development"));
    assert_eq!(machine.state(), PipelineState::StageRunning);
    assert_eq!(machine.stage("development").unwrap().retry_count, 1);

    // The retried attempt finishes normally.
    assert!(machine.complete_stage("development", serde_json::json!("second attempt")));
    assert_eq!(machine.state(), PipelineState::Running);
}

/// Test pause and resume around a stage boundary.
#[tokio::test]
async fn test_pause_and_resume() {
    let ports = MockPorts::succeeding();
    let mut machine = ArtemisStateMachine::builder("card-6", MockPorts::environment(&ports))
        .config(three_stage_config())
        .build()
        .unwrap();

    machine.start(HashMap::new());
    assert!(machine.pause());
    assert_eq!(machine.state(), PipelineState::Paused);

    // No stage can start while paused.
    assert_eq!(machine.begin_stage("architecture"), StageStart::Refused);

    assert!(machine.resume_run());
    assert_eq!(machine.begin_stage("architecture"), StageStart::Started);
}

/// Test that transition events reach an injected sink.
#[tokio::test]
async fn test_event_sink_observes_run() {
    let ports = MockPorts::succeeding();
    let sink = Arc::new(MemoryEventSink::new());
    let mut machine = ArtemisStateMachine::builder("card-7", MockPorts::environment(&ports))
        .config(three_stage_config())
        .event_sink(sink.clone())
        .build()
        .unwrap();

    machine.start(HashMap::new());
    machine.begin_stage("architecture");
    machine.complete_stage("architecture", serde_json::json!(null));

    assert!(sink.len() >= 4); // start, init, stage start, stage finish, back to running
    assert!(sink
        .events()
        .iter()
        .all(|event| event.card_id.as_deref() == Some("card-7")));
}

/// Test the audit invariants over a run with rejections mixed in.
#[tokio::test]
async fn test_history_and_stats_invariants() {
    let ports = MockPorts::succeeding();
    let mut machine = ArtemisStateMachine::builder("card-8", MockPorts::environment(&ports))
        .config(three_stage_config())
        .build()
        .unwrap();

    machine.start(HashMap::new());
    machine.begin_stage("architecture");
    // Completing a different run state is refused and must not appear in
    // the history.
    assert!(!machine.complete());
    machine.complete_stage("architecture", serde_json::json!(null));

    let stats = machine.stats();
    assert_eq!(
        stats.total_transitions,
        stats.successful_transitions + stats.rejected_transitions
    );
    assert_eq!(stats.successful_transitions, machine.history().len() as u64);
    assert!(stats.rejected_transitions >= 1);

    // History is ordered by call sequence: each record chains on the last.
    let history = machine.history();
    for pair in history.windows(2) {
        assert_eq!(pair[0].to_state, pair[1].from_state);
    }
}
