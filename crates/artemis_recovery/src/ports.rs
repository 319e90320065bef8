//! Collaborator ports for recovery handlers.
//!
//! Handlers never touch the outside world directly: every side effect goes
//! through one of these narrow, injectable ports. Port implementations own
//! their own timeouts and pacing; a port call must return in bounded time.
//!
//! All ports answer with a plain success boolean. Failing to perform a
//! recovery action is an expected outcome, not an error.

use std::sync::Arc;

use async_trait::async_trait;

/// Control over pipeline worker processes.
#[async_trait]
pub trait ProcessControl: Send + Sync {
    async fn terminate(&self, pid: u32) -> bool;
    /// Returns the number of zombie processes reaped.
    async fn reap_zombies(&self) -> usize;
    async fn release_lock(&self, path: &str) -> bool;
}

/// Host resource management.
#[async_trait]
pub trait SystemResources: Send + Sync {
    async fn free_memory(&self) -> bool;
    async fn purge_disk(&self) -> bool;
    async fn network_reachable(&self) -> bool;
    async fn fix_permissions(&self, path: &str) -> bool;
}

/// Build, test, and dependency tooling of the workspace under development.
#[async_trait]
pub trait BuildTools: Send + Sync {
    async fn install_package(&self, package: &str, version: Option<&str>) -> bool;
    async fn rebuild(&self) -> bool;
    async fn run_tests(&self) -> bool;
    async fn apply_lint_fixes(&self) -> bool;
    async fn audit_fix(&self) -> bool;
}

/// The LLM client shared by the pipeline's agents.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn retry_last_call(&self) -> bool;
    async fn switch_provider(&self) -> bool;
    async fn throttle(&self, seconds: u64) -> bool;
    async fn reparse_last_response(&self) -> bool;
}

/// Pipeline data: kanban board, state backups, RAG index.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn restore_backup(&self, card_id: &str) -> bool;
    async fn rebuild_index(&self) -> bool;
    async fn verify_integrity(&self) -> bool;
    async fn reset_card(&self, card_id: &str) -> bool;
}

/// Coordination across the pipeline's agents.
#[async_trait]
pub trait AgentCoordination: Send + Sync {
    async fn arbitrate(&self, stage: &str) -> bool;
    async fn restart_messenger(&self) -> bool;
    async fn reset_agents(&self, stage: &str) -> bool;
}

/// Bundle of every collaborator port, constructed once at process start
/// and passed by reference to the components that need it.
#[derive(Clone)]
pub struct RecoveryEnvironment {
    pub process: Arc<dyn ProcessControl>,
    pub system: Arc<dyn SystemResources>,
    pub build: Arc<dyn BuildTools>,
    pub llm: Arc<dyn LlmGateway>,
    pub data: Arc<dyn DataStore>,
    pub agents: Arc<dyn AgentCoordination>,
}

impl RecoveryEnvironment {
    pub fn new(
        process: Arc<dyn ProcessControl>,
        system: Arc<dyn SystemResources>,
        build: Arc<dyn BuildTools>,
        llm: Arc<dyn LlmGateway>,
        data: Arc<dyn DataStore>,
        agents: Arc<dyn AgentCoordination>,
    ) -> Self {
        Self {
            process,
            system,
            build,
            llm,
            data,
            agents,
        }
    }
}
