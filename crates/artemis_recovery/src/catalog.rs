//! Pre-built recovery workflow catalog.
//!
//! One workflow per issue type, resolved against the handler registry at
//! construction time, plus a default workflow for issue types without a
//! dedicated entry. Lookups hand out shared `Arc`s; the definitions are
//! never mutated after construction.

use std::collections::HashMap;
use std::sync::Arc;

use artemis_core::PipelineState;
use tracing::debug;

use crate::error::RecoveryResult;
use crate::handlers::HandlerRegistry;
use crate::issue::IssueType;
use crate::workflow::{Workflow, WorkflowAction, WorkflowBuilder};

/// Maps every `IssueType` to its recovery workflow.
pub struct WorkflowCatalog {
    workflows: HashMap<IssueType, Arc<Workflow>>,
    default: Arc<Workflow>,
}

impl WorkflowCatalog {
    /// Build the standard catalog over a handler registry.
    ///
    /// Fails only when the registry is missing a handler the catalog
    /// names, which is a wiring error caught at startup.
    pub fn standard(registry: &HandlerRegistry) -> RecoveryResult<Self> {
        use IssueType::*;

        let action = |name: &str| -> RecoveryResult<WorkflowAction> {
            Ok(WorkflowAction::new(registry.get_required(name)?))
        };
        let retrying = |name: &str, retries: u32| -> RecoveryResult<WorkflowAction> {
            Ok(action(name)?.with_retries(retries))
        };

        let mut workflows: HashMap<IssueType, Arc<Workflow>> = HashMap::new();
        let mut add = |workflow: Workflow| {
            debug!("Catalog workflow '{}' for {}", workflow.name, workflow.issue_type);
            workflows.insert(workflow.issue_type, Arc::new(workflow));
        };

        // Infrastructure
        add(WorkflowBuilder::new("timeout-recovery", Timeout)
            .action(action("increase_timeout")?)
            .build());
        add(WorkflowBuilder::new("hanging-process-recovery", HangingProcess)
            .action(retrying("kill_hanging_process", 1)?)
            .action(action("reap_zombie_processes")?)
            .build());
        add(WorkflowBuilder::new("memory-recovery", MemoryExhausted)
            .action(retrying("free_memory", 2)?)
            .build());
        add(WorkflowBuilder::new("disk-recovery", DiskFull)
            .action(retrying("purge_disk_space", 2)?)
            .build());
        add(WorkflowBuilder::new("network-recovery", NetworkError)
            .action(retrying("probe_network", 3)?)
            .build());

        // Code
        add(WorkflowBuilder::new("compilation-recovery", CompilationError)
            .action(retrying("rebuild_project", 1)?)
            .build());
        add(WorkflowBuilder::new("test-failure-recovery", TestFailure)
            .action(retrying("rerun_tests", 2)?)
            .build());
        add(
            WorkflowBuilder::new("vulnerability-recovery", SecurityVulnerability)
                .action(action("patch_vulnerability")?)
                .action(action("rerun_tests")?)
                .rollback_on_failure(true)
                .build(),
        );
        add(WorkflowBuilder::new("lint-recovery", LintingError)
            .action(action("apply_lint_fixes")?)
            .build());

        // Dependency
        add(
            WorkflowBuilder::new("missing-dependency-recovery", MissingDependency)
                .action(retrying("install_missing_dependency", 3)?)
                .build(),
        );
        add(WorkflowBuilder::new("version-conflict-recovery", VersionConflict)
            .action(retrying("pin_dependency_version", 2)?)
            .action(action("rebuild_project")?)
            .build());
        add(WorkflowBuilder::new("import-error-recovery", ImportError)
            .action(action("install_missing_dependency")?)
            .action(action("rebuild_project")?)
            .build());

        // LLM
        add(WorkflowBuilder::new("llm-api-recovery", LlmApiError)
            .action(retrying("retry_llm_call", 3)?)
            .action(action("switch_llm_provider")?)
            .build());
        add(WorkflowBuilder::new("llm-timeout-recovery", LlmTimeout)
            .action(action("increase_timeout")?)
            .action(retrying("retry_llm_call", 2)?)
            .build());
        add(WorkflowBuilder::new("llm-rate-limit-recovery", LlmRateLimit)
            .action(action("throttle_llm_requests")?)
            .action(retrying("retry_llm_call", 3)?)
            .build());
        add(
            WorkflowBuilder::new("invalid-response-recovery", InvalidLlmResponse)
                .action(retrying("reparse_llm_response", 2)?)
                .action(action("retry_llm_call")?)
                .build(),
        );

        // Stage-specific
        add(
            WorkflowBuilder::new("architecture-recovery", ArchitectureInvalid)
                .action(action("mark_stage_for_rerun")?)
                .build(),
        );
        add(WorkflowBuilder::new("review-recovery", CodeReviewFailed)
            .action(action("mark_stage_for_rerun")?)
            .build());
        add(
            WorkflowBuilder::new("integration-recovery", IntegrationConflict)
                .action(action("arbitrate_conflict")?)
                .action(action("mark_stage_for_rerun")?)
                .rollback_on_failure(true)
                .build(),
        );
        add(WorkflowBuilder::new("validation-recovery", ValidationFailed)
            .action(action("mark_stage_for_rerun")?)
            .action(action("rerun_tests")?)
            .rollback_on_failure(true)
            .build());

        // Multi-agent
        add(WorkflowBuilder::new("deadlock-recovery", ArbitrationDeadlock)
            .action(retrying("arbitrate_conflict", 1)?)
            .build());
        add(WorkflowBuilder::new("developer-conflict-recovery", DeveloperConflict)
            .action(action("arbitrate_conflict")?)
            .action(action("reset_stage_agents")?)
            .build());
        add(WorkflowBuilder::new("messenger-recovery", MessengerError)
            .action(retrying("restart_messenger", 2)?)
            .build());

        // Data
        add(WorkflowBuilder::new("invalid-card-recovery", InvalidCard)
            .action(action("reset_kanban_card")?)
            .build());
        // The restore is the recovery: an extra rollback would double-revert.
        add(WorkflowBuilder::new("corrupted-state-recovery", CorruptedState)
            .action(action("restore_state_backup")?)
            .rollback_on_failure(false)
            .build());
        add(WorkflowBuilder::new("rag-recovery", RagError)
            .action(retrying("rebuild_rag_index", 1)?)
            .build());

        // System
        add(WorkflowBuilder::new("zombie-recovery", ZombieProcess)
            .action(action("reap_zombie_processes")?)
            .build());
        add(WorkflowBuilder::new("file-lock-recovery", FileLock)
            .action(retrying("release_file_lock", 2)?)
            .build());
        add(WorkflowBuilder::new("permission-recovery", PermissionDenied)
            .action(action("fix_permissions")?)
            .build());

        // Fallback for issue types without a dedicated entry: verify the
        // stored state, then rerun the stage. The issue_type is nominal.
        let default = Arc::new(
            WorkflowBuilder::new("default-recovery", Timeout)
                .action(action("verify_data_integrity")?)
                .action(action("mark_stage_for_rerun")?)
                .build(),
        );

        Ok(Self { workflows, default })
    }

    /// Workflow for `issue_type`, falling back to the default entry.
    pub fn get(&self, issue_type: IssueType) -> Arc<Workflow> {
        match self.workflows.get(&issue_type) {
            Some(workflow) => workflow.clone(),
            None => self.default.clone(),
        }
    }

    /// Workflow for `issue_type`, without the default fallback.
    pub fn lookup(&self, issue_type: IssueType) -> Option<Arc<Workflow>> {
        self.workflows.get(&issue_type).cloned()
    }

    pub fn default_workflow(&self) -> Arc<Workflow> {
        self.default.clone()
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}
