//! Workflow executor.
//!
//! Runs a workflow's actions strictly in list order; later actions may
//! assume earlier ones succeeded. Each action gets its own retry budget
//! (immediate retries, no backoff at this layer; pacing belongs to the
//! handlers that own the external call). The executor drives the pipeline
//! state machine to the workflow's success or failure state, rolling back
//! to the last saved state when the workflow asks for it.

use std::collections::HashMap;

use artemis_core::{EventType, PipelineState, StateStack, StateTransitionEngine};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::context::ActionContext;
use crate::issue::IssueType;
use crate::workflow::Workflow;

/// Outcome of one workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowOutcome {
    pub workflow_name: String,
    pub issue_type: IssueType,
    pub succeeded: bool,
    pub actions_completed: usize,
    pub failed_action: Option<String>,
    /// Invocation counts per action name.
    pub attempts: HashMap<String, u32>,
    pub final_state: PipelineState,
    pub rolled_back: bool,
}

/// Executes recovery workflows against the pipeline state machine.
#[derive(Debug, Default)]
pub struct WorkflowExecutor;

impl WorkflowExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Run `workflow`, driving `engine` to its success or failure state.
    pub async fn execute(
        &self,
        workflow: &Workflow,
        ctx: &mut ActionContext,
        engine: &mut StateTransitionEngine,
        stack: &mut StateStack,
    ) -> WorkflowOutcome {
        info!(
            "Executing workflow '{}' ({} action(s)) for {}",
            workflow.name,
            workflow.actions.len(),
            workflow.issue_type
        );

        let mut attempts: HashMap<String, u32> = HashMap::new();

        for (index, action) in workflow.actions.iter().enumerate() {
            let mut attempt: u32 = 0;
            loop {
                attempt += 1;
                attempts.insert(action.name.clone(), attempt);

                match action.handler.handle(ctx).await {
                    Ok(true) => {
                        debug!("Action '{}' succeeded (attempt {})", action.name, attempt);
                        break;
                    }
                    Ok(false) if action.retry_on_failure && attempt <= action.max_retries => {
                        warn!(
                            "Action '{}' failed (attempt {}/{}), retrying",
                            action.name,
                            attempt,
                            action.max_retries + 1
                        );
                    }
                    Ok(false) => {
                        warn!(
                            "Action '{}' exhausted after {} attempt(s)",
                            action.name, attempt
                        );
                        return self.fail_workflow(workflow, engine, stack, index, action.name.clone(), attempts);
                    }
                    Err(e) => {
                        // Unexpected fault: no retries, higher severity.
                        error!("Action '{}' faulted: {}", action.name, e);
                        return self.fail_workflow(workflow, engine, stack, index, action.name.clone(), attempts);
                    }
                }
            }
        }

        engine.transition_with(
            workflow.success_state,
            EventType::RecoverySucceeded,
            Some(&workflow.name),
            HashMap::new(),
        );
        info!("Workflow '{}' succeeded", workflow.name);

        WorkflowOutcome {
            workflow_name: workflow.name.clone(),
            issue_type: workflow.issue_type,
            succeeded: true,
            actions_completed: workflow.actions.len(),
            failed_action: None,
            attempts,
            final_state: engine.current_state(),
            rolled_back: false,
        }
    }

    fn fail_workflow(
        &self,
        workflow: &Workflow,
        engine: &mut StateTransitionEngine,
        stack: &mut StateStack,
        actions_completed: usize,
        failed_action: String,
        attempts: HashMap<String, u32>,
    ) -> WorkflowOutcome {
        engine.transition_with(
            workflow.failure_state,
            EventType::RecoveryFailed,
            Some(&failed_action),
            HashMap::new(),
        );

        let mut rolled_back = false;
        if workflow.rollback_on_failure {
            engine.transition_with(
                PipelineState::RollingBack,
                EventType::RollbackStarted,
                Some(&workflow.name),
                HashMap::new(),
            );
            match stack.pop() {
                Some(previous) => {
                    rolled_back = engine.transition_with(
                        previous,
                        EventType::RollbackCompleted,
                        Some("restored pre-stage state"),
                        HashMap::new(),
                    );
                }
                None => {
                    // Nothing to roll back to: the pipeline cannot prove a
                    // safe prior state, so it aborts.
                    warn!(
                        "Workflow '{}' requested rollback with an empty stack, aborting",
                        workflow.name
                    );
                    engine.transition_with(
                        PipelineState::Aborted,
                        EventType::PipelineAborted,
                        Some("rollback with no saved state"),
                        HashMap::new(),
                    );
                }
            }
        }

        WorkflowOutcome {
            workflow_name: workflow.name.clone(),
            issue_type: workflow.issue_type,
            succeeded: false,
            actions_completed,
            failed_action: Some(failed_action),
            attempts,
            final_state: engine.current_state(),
            rolled_back,
        }
    }
}
