//! # artemis_recovery
//!
//! Recovery workflow engine for the Artemis pipeline.
//!
//! When a pipeline stage fails, this crate turns the failure into a repair
//! attempt: the description is classified into an `IssueType`, the catalog
//! supplies the matching `Workflow`, and the executor runs its actions with
//! per-action retry budgets, driving the state machine to the workflow's
//! success or failure state.
//!
//! # Architecture
//!
//! - **Issues**: closed failure taxonomy plus a keyword classifier
//! - **Workflows**: immutable action lists with retry policy and target states
//! - **Handlers**: one side-effecting operation each, behind collaborator ports
//! - **Catalog**: one pre-built workflow per issue type, plus a default
//! - **Executor**: ordered execution, immediate retries, optional rollback
//! - **Generator**: boundary for LLM-synthesized workflows when nothing matches
//!
//! # Example
//!
//! ```rust,ignore
//! use artemis_recovery::{
//!     FailureReport, HandlerFactory, RecoveryEngine, WorkflowCatalog,
//! };
//!
//! let registry = HandlerFactory::new(environment).build_registry();
//! let catalog = WorkflowCatalog::standard(&registry)?;
//! let recovery = RecoveryEngine::new(catalog);
//!
//! let report = FailureReport::new("ModuleNotFoundError: no module named 'requests'");
//! let outcome = recovery.recover(&report, &mut ctx, &mut engine, &mut stack).await;
//! ```

pub mod catalog;
pub mod classifier;
pub mod context;
pub mod engine;
pub mod error;
pub mod executor;
pub mod generator;
pub mod handlers;
pub mod issue;
pub mod mock;
pub mod ports;
pub mod workflow;

// Re-export main types for convenience
pub use catalog::WorkflowCatalog;
pub use classifier::IssueClassifier;
pub use context::ActionContext;
pub use engine::{RecoveryEngine, RecoveryOutcome};
pub use error::{RecoveryError, RecoveryResult};
pub use executor::{WorkflowExecutor, WorkflowOutcome};
pub use generator::{NullWorkflowGenerator, WorkflowGenerator};
pub use handlers::{HandlerFactory, HandlerRegistry, RecoveryHandler};
pub use issue::{FailureReport, IssueDomain, IssueType};
pub use ports::{
    AgentCoordination, BuildTools, DataStore, LlmGateway, ProcessControl, RecoveryEnvironment,
    SystemResources,
};
pub use workflow::{Workflow, WorkflowAction, WorkflowBuilder};
