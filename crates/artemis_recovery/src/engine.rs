//! Recovery engine: classification → workflow selection → execution.

use std::collections::HashMap;
use std::sync::Arc;

use artemis_core::{EventType, PipelineState, StateStack, StateTransitionEngine};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::classifier::IssueClassifier;
use crate::context::ActionContext;
use crate::executor::{WorkflowExecutor, WorkflowOutcome};
use crate::generator::WorkflowGenerator;
use crate::issue::{FailureReport, IssueType};
use crate::catalog::WorkflowCatalog;

/// Result of one recovery attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryOutcome {
    /// Classified issue type; `None` when classification failed.
    pub issue_type: Option<IssueType>,
    /// Whether the executed workflow came from the generator.
    pub generated: bool,
    /// Executor outcome; `None` when no workflow could be obtained.
    pub workflow: Option<WorkflowOutcome>,
    pub recovered: bool,
}

/// Classifies failures and runs the matching recovery workflow.
pub struct RecoveryEngine {
    catalog: WorkflowCatalog,
    executor: WorkflowExecutor,
    generator: Option<Arc<dyn WorkflowGenerator>>,
}

impl RecoveryEngine {
    pub fn new(catalog: WorkflowCatalog) -> Self {
        Self {
            catalog,
            executor: WorkflowExecutor::new(),
            generator: None,
        }
    }

    /// Fall back to a workflow generator for unclassifiable failures.
    pub fn with_generator(mut self, generator: Arc<dyn WorkflowGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn catalog(&self) -> &WorkflowCatalog {
        &self.catalog
    }

    /// Attempt recovery from a stage failure.
    ///
    /// Transitions the pipeline to `Recovering`, picks a workflow (catalog
    /// entry for a classified issue, generator output otherwise), and runs
    /// it. When no workflow can be obtained the pipeline goes to `Failed`.
    pub async fn recover(
        &self,
        report: &FailureReport,
        ctx: &mut ActionContext,
        engine: &mut StateTransitionEngine,
        stack: &mut StateStack,
    ) -> RecoveryOutcome {
        engine.transition_with(
            PipelineState::Recovering,
            EventType::RecoveryStarted,
            Some(&report.description),
            HashMap::new(),
        );

        let issue_type = IssueClassifier::classify(report);

        let (workflow, generated) = match issue_type {
            Some(issue_type) => {
                info!("Recovering from {} via catalog", issue_type);
                (self.catalog.get(issue_type), false)
            }
            None => match &self.generator {
                Some(generator) => match generator.generate(report).await {
                    Ok(workflow) => {
                        info!("Recovering via generated workflow '{}'", workflow.name);
                        (Arc::new(workflow), true)
                    }
                    Err(e) => {
                        error!("Workflow generation failed: {}", e);
                        return self.give_up(engine, issue_type);
                    }
                },
                None => {
                    warn!(
                        "Unclassifiable failure and no generator configured: {}",
                        report.description
                    );
                    return self.give_up(engine, issue_type);
                }
            },
        };

        let outcome = self.executor.execute(&workflow, ctx, engine, stack).await;
        RecoveryOutcome {
            issue_type,
            generated,
            recovered: outcome.succeeded,
            workflow: Some(outcome),
        }
    }

    fn give_up(
        &self,
        engine: &mut StateTransitionEngine,
        issue_type: Option<IssueType>,
    ) -> RecoveryOutcome {
        engine.transition_with(
            PipelineState::Failed,
            EventType::RecoveryFailed,
            Some("no recovery workflow available"),
            HashMap::new(),
        );
        RecoveryOutcome {
            issue_type,
            generated: false,
            workflow: None,
            recovered: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::MockWorkflowGenerator;
    use crate::handlers::HandlerFactory;
    use crate::mock::{CountingHandler, MockPorts};
    use crate::workflow::{WorkflowAction, WorkflowBuilder};
    use crate::error::RecoveryError;

    fn failed_stage_engine() -> StateTransitionEngine {
        let mut engine = StateTransitionEngine::new();
        assert!(engine.transition(PipelineState::Initializing, EventType::PipelineStarted));
        assert!(engine.transition(PipelineState::Running, EventType::Initialized));
        assert!(engine.transition(PipelineState::StageRunning, EventType::StageStarted));
        assert!(engine.transition(PipelineState::StageFailed, EventType::StageFailed));
        engine
    }

    fn recovery_engine(ports: &Arc<MockPorts>) -> RecoveryEngine {
        let registry = HandlerFactory::new(MockPorts::environment(ports)).build_registry();
        RecoveryEngine::new(WorkflowCatalog::standard(&registry).unwrap())
    }

    #[tokio::test]
    async fn test_classified_failure_uses_catalog() {
        let ports = MockPorts::succeeding();
        let recovery = recovery_engine(&ports);

        let mut engine = failed_stage_engine();
        let mut stack = StateStack::new();
        let mut ctx = ActionContext::new("card-1")
            .with_stage("development")
            .with_value("package", serde_json::json!("requests"));

        let report = FailureReport::new("ModuleNotFoundError: no module named 'requests'");
        let outcome = recovery
            .recover(&report, &mut ctx, &mut engine, &mut stack)
            .await;

        assert_eq!(outcome.issue_type, Some(IssueType::MissingDependency));
        assert!(!outcome.generated);
        assert!(outcome.recovered);
        assert_eq!(engine.current_state(), PipelineState::Running);
        assert_eq!(ports.calls("install_package"), 1);
    }

    #[tokio::test]
    async fn test_unclassifiable_without_generator_fails_pipeline() {
        let ports = MockPorts::succeeding();
        let recovery = recovery_engine(&ports);

        let mut engine = failed_stage_engine();
        let mut stack = StateStack::new();
        let mut ctx = ActionContext::new("card-1");

        let report = FailureReport::new("the moon phase is unfavourable");
        let outcome = recovery
            .recover(&report, &mut ctx, &mut engine, &mut stack)
            .await;

        assert!(outcome.issue_type.is_none());
        assert!(!outcome.recovered);
        assert!(outcome.workflow.is_none());
        assert_eq!(engine.current_state(), PipelineState::Failed);
    }

    #[tokio::test]
    async fn test_generated_workflow_runs_like_catalog_one() {
        let ports = MockPorts::succeeding();
        let handler = CountingHandler::succeeding("synthesized-step");

        let mut generator = MockWorkflowGenerator::new();
        let generated = WorkflowBuilder::new("synthesized", IssueType::Timeout)
            .action(WorkflowAction::new(handler.clone()))
            .build();
        generator
            .expect_generate()
            .times(1)
            .return_once(move |_| Ok(generated));

        let recovery = recovery_engine(&ports).with_generator(Arc::new(generator));

        let mut engine = failed_stage_engine();
        let mut stack = StateStack::new();
        let mut ctx = ActionContext::new("card-1");

        let report = FailureReport::new("the moon phase is unfavourable");
        let outcome = recovery
            .recover(&report, &mut ctx, &mut engine, &mut stack)
            .await;

        assert!(outcome.generated);
        assert!(outcome.recovered);
        assert_eq!(handler.calls(), 1);
        assert_eq!(engine.current_state(), PipelineState::Running);
    }

    #[tokio::test]
    async fn test_generation_failure_fails_pipeline() {
        let ports = MockPorts::succeeding();

        let mut generator = MockWorkflowGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .return_once(|_| Err(RecoveryError::GenerationFailed("model declined".to_string())));

        let recovery = recovery_engine(&ports).with_generator(Arc::new(generator));

        let mut engine = failed_stage_engine();
        let mut stack = StateStack::new();
        let mut ctx = ActionContext::new("card-1");

        let outcome = recovery
            .recover(
                &FailureReport::new("the moon phase is unfavourable"),
                &mut ctx,
                &mut engine,
                &mut stack,
            )
            .await;

        assert!(!outcome.recovered);
        assert_eq!(engine.current_state(), PipelineState::Failed);
    }
}
