//! Recovery workflow data model.
//!
//! A `Workflow` is an immutable, declarative recipe: an ordered list of
//! actions, the pipeline state to enter when every action succeeds, and the
//! state to enter when one is exhausted. Definitions are built once at
//! catalog construction and shared across invocations; all execution state
//! (attempt counts) lives in the executor.

use std::sync::Arc;

use artemis_core::PipelineState;

use crate::handlers::RecoveryHandler;
use crate::issue::IssueType;

/// One named recovery action with its retry policy.
#[derive(Clone)]
pub struct WorkflowAction {
    pub name: String,
    pub handler: Arc<dyn RecoveryHandler>,
    pub retry_on_failure: bool,
    pub max_retries: u32,
}

impl WorkflowAction {
    /// Action without retries, named after its handler.
    pub fn new(handler: Arc<dyn RecoveryHandler>) -> Self {
        Self {
            name: handler.name().to_string(),
            handler,
            retry_on_failure: false,
            max_retries: 0,
        }
    }

    /// Allow up to `max_retries` extra attempts after a failed one.
    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.retry_on_failure = true;
        self.max_retries = max_retries;
        self
    }
}

impl std::fmt::Debug for WorkflowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowAction")
            .field("name", &self.name)
            .field("retry_on_failure", &self.retry_on_failure)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Immutable recovery recipe for one issue type.
#[derive(Debug, Clone)]
pub struct Workflow {
    pub name: String,
    pub issue_type: IssueType,
    pub actions: Vec<WorkflowAction>,
    pub success_state: PipelineState,
    pub failure_state: PipelineState,
    pub rollback_on_failure: bool,
}

/// Builder for recovery workflows.
pub struct WorkflowBuilder {
    name: String,
    issue_type: IssueType,
    actions: Vec<WorkflowAction>,
    success_state: PipelineState,
    failure_state: PipelineState,
    rollback_on_failure: bool,
}

impl WorkflowBuilder {
    pub fn new(name: impl Into<String>, issue_type: IssueType) -> Self {
        Self {
            name: name.into(),
            issue_type,
            actions: Vec::new(),
            success_state: PipelineState::Running,
            failure_state: PipelineState::Failed,
            rollback_on_failure: false,
        }
    }

    pub fn action(mut self, action: WorkflowAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn success_state(mut self, state: PipelineState) -> Self {
        self.success_state = state;
        self
    }

    pub fn failure_state(mut self, state: PipelineState) -> Self {
        self.failure_state = state;
        self
    }

    pub fn rollback_on_failure(mut self, rollback: bool) -> Self {
        self.rollback_on_failure = rollback;
        self
    }

    /// Build the workflow.
    ///
    /// Panics on an empty action list: a workflow with nothing to do is a
    /// programming error in the catalog, not a runtime condition.
    pub fn build(self) -> Workflow {
        assert!(
            !self.actions.is_empty(),
            "workflow '{}' has no actions",
            self.name
        );
        Workflow {
            name: self.name,
            issue_type: self.issue_type,
            actions: self.actions,
            success_state: self.success_state,
            failure_state: self.failure_state,
            rollback_on_failure: self.rollback_on_failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::CountingHandler;

    #[test]
    fn test_builder_defaults() {
        let workflow = WorkflowBuilder::new("timeout-recovery", IssueType::Timeout)
            .action(WorkflowAction::new(CountingHandler::succeeding("noop")))
            .build();

        assert_eq!(workflow.success_state, PipelineState::Running);
        assert_eq!(workflow.failure_state, PipelineState::Failed);
        assert!(!workflow.rollback_on_failure);
        assert_eq!(workflow.actions.len(), 1);
    }

    #[test]
    fn test_action_retry_policy() {
        let action = WorkflowAction::new(CountingHandler::failing("flaky")).with_retries(3);
        assert!(action.retry_on_failure);
        assert_eq!(action.max_retries, 3);
        assert_eq!(action.name, "flaky");
    }

    #[test]
    #[should_panic(expected = "has no actions")]
    fn test_empty_workflow_panics_at_build_time() {
        let _ = WorkflowBuilder::new("empty", IssueType::Timeout).build();
    }
}
