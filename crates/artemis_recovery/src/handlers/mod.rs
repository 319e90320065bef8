//! Recovery handler contract, registry, and factory.
//!
//! A handler is the smallest unit of recovery work: one side-effecting
//! operation with a boolean success contract. Handlers convert every
//! expected failure mode into `Ok(false)`; an `Err` is reserved for faults
//! the handler could not anticipate and aborts the enclosing workflow
//! without consuming retries.
//!
//! # Handler lifecycle
//!
//! 1. **Construction**: `HandlerFactory` builds the full handler set over a
//!    `RecoveryEnvironment` of collaborator ports.
//! 2. **Registration**: handlers are stored in a `HandlerRegistry` by name.
//! 3. **Lookup**: the workflow catalog resolves action names against the
//!    registry when it is built.
//! 4. **Execution**: the executor calls `handle` with the shared context.

mod agents;
mod build;
mod data;
mod llm;
mod process;
mod system;

pub use agents::{ArbitrateConflictHandler, ResetStageAgentsHandler, RestartMessengerHandler};
pub use build::{
    ApplyLintFixesHandler, InstallDependencyHandler, PatchVulnerabilityHandler,
    PinVersionHandler, RebuildProjectHandler, RerunTestsHandler,
};
pub use data::{
    RebuildRagIndexHandler, ResetCardHandler, RestoreStateBackupHandler, VerifyIntegrityHandler,
};
pub use llm::{
    ReparseLlmResponseHandler, RetryLlmCallHandler, SwitchLlmProviderHandler,
    ThrottleLlmRequestsHandler,
};
pub use process::{KillHangingProcessHandler, ReapZombiesHandler, ReleaseFileLockHandler};
pub use system::{
    FixPermissionsHandler, FreeMemoryHandler, IncreaseTimeoutHandler, MarkStageForRerunHandler,
    ProbeNetworkHandler, PurgeDiskHandler,
};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::context::ActionContext;
use crate::error::{RecoveryError, RecoveryResult};
use crate::ports::RecoveryEnvironment;

/// Trait for recovery handler implementations.
///
/// `Ok(true)` means the action succeeded, `Ok(false)` an expected failure
/// (eligible for retry), `Err` an unexpected fault. Handlers guard against
/// missing context keys themselves and own any timeout on the work they do.
#[async_trait]
pub trait RecoveryHandler: Send + Sync {
    /// Unique handler name, used for registry lookup and logging.
    fn name(&self) -> &str;

    /// Perform the recovery action.
    async fn handle(&self, ctx: &mut ActionContext) -> RecoveryResult<bool>;
}

/// A registry of recovery handlers, keyed by name.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn RecoveryHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under its `name()` identifier, replacing any
    /// previous registration.
    pub fn register(&mut self, handler: Arc<dyn RecoveryHandler>) {
        let name = handler.name().to_string();
        debug!("Registering recovery handler: {}", name);
        self.handlers.insert(name, handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn RecoveryHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Get a handler by name, or an error for catalog construction.
    pub fn get_required(&self, name: &str) -> RecoveryResult<Arc<dyn RecoveryHandler>> {
        self.get(name)
            .ok_or_else(|| RecoveryError::HandlerNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builds the standard handler set over a `RecoveryEnvironment`.
pub struct HandlerFactory {
    environment: RecoveryEnvironment,
}

impl HandlerFactory {
    pub fn new(environment: RecoveryEnvironment) -> Self {
        Self { environment }
    }

    /// Build a registry containing every standard handler.
    pub fn build_registry(&self) -> HandlerRegistry {
        let env = &self.environment;
        let mut registry = HandlerRegistry::new();

        // Process control
        registry.register(Arc::new(KillHangingProcessHandler::new(env.process.clone())));
        registry.register(Arc::new(ReapZombiesHandler::new(env.process.clone())));
        registry.register(Arc::new(ReleaseFileLockHandler::new(env.process.clone())));

        // Host resources
        registry.register(Arc::new(FreeMemoryHandler::new(env.system.clone())));
        registry.register(Arc::new(PurgeDiskHandler::new(env.system.clone())));
        registry.register(Arc::new(ProbeNetworkHandler::new(env.system.clone())));
        registry.register(Arc::new(FixPermissionsHandler::new(env.system.clone())));
        registry.register(Arc::new(IncreaseTimeoutHandler::new()));
        registry.register(Arc::new(MarkStageForRerunHandler::new()));

        // Build tooling
        registry.register(Arc::new(InstallDependencyHandler::new(env.build.clone())));
        registry.register(Arc::new(PinVersionHandler::new(env.build.clone())));
        registry.register(Arc::new(RebuildProjectHandler::new(env.build.clone())));
        registry.register(Arc::new(RerunTestsHandler::new(env.build.clone())));
        registry.register(Arc::new(ApplyLintFixesHandler::new(env.build.clone())));
        registry.register(Arc::new(PatchVulnerabilityHandler::new(env.build.clone())));

        // LLM client
        registry.register(Arc::new(RetryLlmCallHandler::new(env.llm.clone())));
        registry.register(Arc::new(SwitchLlmProviderHandler::new(env.llm.clone())));
        registry.register(Arc::new(ThrottleLlmRequestsHandler::new(env.llm.clone())));
        registry.register(Arc::new(ReparseLlmResponseHandler::new(env.llm.clone())));

        // Pipeline data
        registry.register(Arc::new(RestoreStateBackupHandler::new(env.data.clone())));
        registry.register(Arc::new(RebuildRagIndexHandler::new(env.data.clone())));
        registry.register(Arc::new(VerifyIntegrityHandler::new(env.data.clone())));
        registry.register(Arc::new(ResetCardHandler::new(env.data.clone())));

        // Agent coordination
        registry.register(Arc::new(ArbitrateConflictHandler::new(env.agents.clone())));
        registry.register(Arc::new(RestartMessengerHandler::new(env.agents.clone())));
        registry.register(Arc::new(ResetStageAgentsHandler::new(env.agents.clone())));

        registry
    }
}
