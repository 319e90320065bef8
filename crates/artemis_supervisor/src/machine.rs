//! Top-level state machine facade.
//!
//! `ArtemisStateMachine` composes the transition engine, stage tracking,
//! rollback stack, checkpointing, circuit breakers, and the recovery engine
//! behind one per-card API. The orchestrator drives it through the stage
//! lifecycle; everything else (what a stage actually does) stays outside.

use std::collections::HashMap;
use std::sync::Arc;

use artemis_core::{
    CheckpointIntegration, CheckpointStore, EventSink, EventType, FileCheckpointStore,
    PipelineSnapshot, PipelineState, Progress, SnapshotStatus, StageState, StageStateInfo,
    StageStateManager, StateStack, StateTransition, StateTransitionEngine, TransitionStats,
};
use artemis_recovery::{
    ActionContext, FailureReport, HandlerFactory, RecoveryEngine, RecoveryEnvironment,
    RecoveryOutcome, WorkflowCatalog, WorkflowGenerator,
};
use tracing::{info, warn};

use crate::breaker::{CircuitBreakerManager, StageHealth};
use crate::config::MachineConfig;
use crate::error::SupervisorResult;

/// How a `begin_stage` request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStart {
    /// The stage entered `StageRunning`.
    Started,
    /// The stage's circuit is open; the orchestrator should skip or defer.
    CircuitOpen,
    /// The pipeline is not in a state that can start a stage.
    Refused,
}

/// How a stage failure was resolved.
#[derive(Debug, Clone)]
pub enum FailureResolution {
    /// This failure opened the stage's circuit; no recovery was attempted.
    CircuitOpened,
    /// A recovery workflow ran (successfully or not).
    Recovery(RecoveryOutcome),
}

/// Builder for `ArtemisStateMachine`.
pub struct ArtemisStateMachineBuilder {
    card_id: String,
    config: MachineConfig,
    environment: RecoveryEnvironment,
    store: Option<Arc<dyn CheckpointStore>>,
    sink: Option<Arc<dyn EventSink>>,
    generator: Option<Arc<dyn WorkflowGenerator>>,
}

impl ArtemisStateMachineBuilder {
    pub fn new(card_id: impl Into<String>, environment: RecoveryEnvironment) -> Self {
        Self {
            card_id: card_id.into(),
            config: MachineConfig::default(),
            environment,
            store: None,
            sink: None,
            generator: None,
        }
    }

    pub fn config(mut self, config: MachineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an explicit checkpoint store instead of the configured root.
    pub fn checkpoint_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn workflow_generator(mut self, generator: Arc<dyn WorkflowGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Build the machine. Fails only on catalog wiring errors.
    pub fn build(self) -> SupervisorResult<ArtemisStateMachine> {
        let registry = HandlerFactory::new(self.environment).build_registry();
        let catalog = WorkflowCatalog::standard(&registry)?;
        let mut recovery = RecoveryEngine::new(catalog);
        if let Some(generator) = self.generator {
            recovery = recovery.with_generator(generator);
        }

        let store = self.store.or_else(|| {
            self.config.checkpoint_root.as_ref().map(|root| {
                Arc::new(FileCheckpointStore::new(root.clone())) as Arc<dyn CheckpointStore>
            })
        });

        let mut engine = StateTransitionEngine::new().with_card_id(self.card_id.clone());
        if let Some(sink) = self.sink {
            engine = engine.with_sink(sink);
        }

        Ok(ArtemisStateMachine {
            checkpoints: CheckpointIntegration::new(self.card_id.clone(), store),
            breakers: CircuitBreakerManager::new(self.config.failure_threshold),
            engine,
            stages: StageStateManager::new(),
            stack: StateStack::new(),
            recovery,
            card_id: self.card_id,
            config: self.config,
        })
    }
}

/// Per-card pipeline state machine with recovery and checkpointing.
pub struct ArtemisStateMachine {
    card_id: String,
    config: MachineConfig,
    engine: StateTransitionEngine,
    stages: StageStateManager,
    stack: StateStack,
    checkpoints: CheckpointIntegration,
    breakers: CircuitBreakerManager,
    recovery: RecoveryEngine,
}

impl ArtemisStateMachine {
    pub fn builder(
        card_id: impl Into<String>,
        environment: RecoveryEnvironment,
    ) -> ArtemisStateMachineBuilder {
        ArtemisStateMachineBuilder::new(card_id, environment)
    }

    /// Bring the pipeline from `Idle` to `Running` and open a checkpoint.
    ///
    /// A snapshot adopted through `resume_from_checkpoint` is kept; a fresh
    /// checkpoint is only created when none exists yet.
    pub fn start(&mut self, execution_context: HashMap<String, serde_json::Value>) -> bool {
        if !self
            .engine
            .transition(PipelineState::Initializing, EventType::PipelineStarted)
        {
            return false;
        }
        if self.checkpoints.snapshot().is_none() {
            self.checkpoints
                .create_checkpoint(self.config.stages.len(), execution_context);
        }
        self.engine
            .transition(PipelineState::Running, EventType::Initialized)
    }

    /// Enter a stage, saving a rollback point first.
    ///
    /// Consults the stage's circuit breaker before anything else; an open
    /// circuit refuses the stage without touching pipeline state.
    pub fn begin_stage(&mut self, stage_name: &str) -> StageStart {
        if self.breakers.check_circuit(stage_name) {
            warn!("Stage '{}' skipped: circuit open", stage_name);
            self.stages
                .update_stage_state(stage_name, StageState::CircuitOpen, HashMap::new());
            return StageStart::CircuitOpen;
        }

        let prior = self.engine.current_state();
        let mut metadata = HashMap::new();
        metadata.insert("stage".to_string(), serde_json::json!(stage_name));
        if !self.engine.transition_with(
            PipelineState::StageRunning,
            EventType::StageStarted,
            Some(stage_name),
            metadata,
        ) {
            return StageStart::Refused;
        }

        self.stack.push(prior);
        self.stages
            .update_stage_state(stage_name, StageState::Running, HashMap::new());
        self.stages.set_active_stage(Some(stage_name));
        StageStart::Started
    }

    /// Record a successful stage and return the pipeline to `Running`.
    pub fn complete_stage(&mut self, stage_name: &str, result: serde_json::Value) -> bool {
        if !self.engine.transition_with(
            PipelineState::StageCompleted,
            EventType::StageFinished,
            Some(stage_name),
            HashMap::new(),
        ) {
            return false;
        }

        self.stages
            .update_stage_state(stage_name, StageState::Completed, HashMap::new());
        let duration = self
            .stages
            .get(stage_name)
            .and_then(|info| info.duration_seconds)
            .unwrap_or(0.0);
        self.breakers.record_success(stage_name, duration);
        self.checkpoints
            .save_stage_checkpoint(stage_name, StageState::Completed, Some(result));

        // The risky window is over; drop the rollback point saved at entry.
        self.stack.discard();
        self.stages.set_active_stage(None);

        self.engine
            .transition(PipelineState::Running, EventType::StageFinished)
    }

    /// Record a stage failure and attempt recovery.
    ///
    /// Recording happens first (stage state, checkpoint, breaker). If this
    /// failure opens the circuit no recovery is attempted; otherwise the
    /// failure is classified and the matching workflow executed. On a
    /// successful recovery the pipeline is back at `Running` and the stage
    /// is marked for retry.
    pub async fn fail_stage(
        &mut self,
        stage_name: &str,
        report: FailureReport,
    ) -> FailureResolution {
        let mut metadata = HashMap::new();
        metadata.insert("failure".to_string(), serde_json::json!(report.description));
        self.engine.transition_with(
            PipelineState::StageFailed,
            EventType::StageFailed,
            Some(&report.description),
            metadata.clone(),
        );
        self.stages
            .update_stage_state(stage_name, StageState::Failed, metadata);
        self.checkpoints
            .save_stage_checkpoint(stage_name, StageState::Failed, None);

        if self.breakers.record_failure(stage_name) {
            self.stages
                .update_stage_state(stage_name, StageState::CircuitOpen, HashMap::new());
            self.engine.transition_with(
                PipelineState::CircuitOpen,
                EventType::CircuitOpened,
                Some(stage_name),
                HashMap::new(),
            );
            // Scheduling continues around the blocked stage.
            self.engine
                .transition(PipelineState::Running, EventType::Resumed);
            self.stack.discard();
            self.stages.set_active_stage(None);
            return FailureResolution::CircuitOpened;
        }

        let report = if report.stage_name.is_none() {
            report.with_stage(stage_name)
        } else {
            report
        };
        let mut ctx = ActionContext::new(&self.card_id).with_stage(stage_name);
        for (key, value) in &report.details {
            ctx.set(key.clone(), value.clone());
        }

        let outcome = self
            .recovery
            .recover(&report, &mut ctx, &mut self.engine, &mut self.stack)
            .await;

        if outcome.recovered {
            info!(
                "Stage '{}' recovered via workflow, queueing retry",
                stage_name
            );
            self.stages.record_retry(stage_name);
            // The executor only pops on rollback; drop the entry saved at
            // stage entry now that recovery re-entered the running state.
            self.stack.discard();
        } else {
            // A rollback may have restored a runnable state; only a run
            // that actually stopped gets its snapshot closed out.
            match self.engine.current_state() {
                PipelineState::Aborted => self.checkpoints.mark_status(SnapshotStatus::Aborted),
                PipelineState::Failed => self.checkpoints.mark_status(SnapshotStatus::Failed),
                _ => {}
            }
        }
        self.stages.set_active_stage(None);
        FailureResolution::Recovery(outcome)
    }

    /// Re-enter the current stage for another attempt, without a recovery
    /// workflow.
    ///
    /// Passes through `StageRetrying` back into `StageRunning` and bumps
    /// the stage's retry counter. Refused when the pipeline is not at a
    /// point the retry edges allow.
    pub fn retry_stage(&mut self, stage_name: &str) -> bool {
        if !self.engine.transition_with(
            PipelineState::StageRetrying,
            EventType::StageRetried,
            Some(stage_name),
            HashMap::new(),
        ) {
            return false;
        }
        self.stages.record_retry(stage_name);

        if !self
            .engine
            .transition(PipelineState::StageRunning, EventType::StageStarted)
        {
            return false;
        }
        self.stages
            .update_stage_state(stage_name, StageState::Running, HashMap::new());
        self.stages.set_active_stage(Some(stage_name));
        true
    }

    /// Record a stage as skipped without running it. The pipeline state is
    /// untouched; skipping is a scheduling decision, not a transition.
    pub fn skip_stage(&mut self, stage_name: &str, reason: &str) {
        info!("Stage '{}' skipped: {}", stage_name, reason);
        let mut metadata = HashMap::new();
        metadata.insert("reason".to_string(), serde_json::json!(reason));
        self.stages
            .update_stage_state(stage_name, StageState::Skipped, metadata);
        self.checkpoints
            .save_stage_checkpoint(stage_name, StageState::Skipped, None);
    }

    pub fn pause(&mut self) -> bool {
        self.engine
            .transition(PipelineState::Paused, EventType::Paused)
    }

    pub fn resume_run(&mut self) -> bool {
        self.engine
            .transition(PipelineState::Running, EventType::Resumed)
    }

    /// Finish the pipeline.
    pub fn complete(&mut self) -> bool {
        if !self
            .engine
            .transition(PipelineState::Completed, EventType::PipelineCompleted)
        {
            return false;
        }
        self.checkpoints.mark_status(SnapshotStatus::Completed);
        self.stages.set_active_stage(None);
        true
    }

    /// Abort the pipeline from any non-terminal state.
    pub fn abort(&mut self, reason: &str) -> bool {
        if !self.engine.transition_with(
            PipelineState::Aborted,
            EventType::PipelineAborted,
            Some(reason),
            HashMap::new(),
        ) {
            return false;
        }
        self.checkpoints.mark_status(SnapshotStatus::Aborted);
        self.stages.set_active_stage(None);
        true
    }

    pub fn can_resume(&self) -> bool {
        self.checkpoints.can_resume()
    }

    /// Reload the persisted snapshot and rebuild stage bookkeeping from it.
    ///
    /// Pipeline state is not transitioned; the caller replays `start` and
    /// skips the stages the snapshot reports as completed.
    pub fn resume_from_checkpoint(&mut self) -> Option<PipelineSnapshot> {
        let snapshot = self.checkpoints.resume_from_checkpoint()?;
        for stage_name in &snapshot.stages_completed {
            self.stages.restore_stage(stage_name, StageState::Completed);
        }
        info!(
            "Resumed card '{}' from checkpoint: {}/{} stage(s) already completed",
            self.card_id,
            snapshot.stages_completed.len(),
            snapshot.total_stages
        );
        Some(snapshot)
    }

    pub fn progress(&self) -> Progress {
        self.checkpoints.progress()
    }

    // Read accessors

    pub fn card_id(&self) -> &str {
        &self.card_id
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.engine.current_state()
    }

    pub fn history(&self) -> &[StateTransition] {
        self.engine.history()
    }

    pub fn stats(&self) -> TransitionStats {
        self.engine.stats()
    }

    pub fn summary(&self) -> String {
        self.engine.summary()
    }

    pub fn stage(&self, stage_name: &str) -> Option<&StageStateInfo> {
        self.stages.get(stage_name)
    }

    pub fn stage_health(&self, stage_name: &str) -> Option<&StageHealth> {
        self.breakers.health(stage_name)
    }

    pub fn open_circuits(&self) -> Vec<String> {
        self.breakers.open_circuits()
    }
}
