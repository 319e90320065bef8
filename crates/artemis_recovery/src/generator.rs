//! Fallback workflow generation boundary.
//!
//! When a failure cannot be classified into any catalog issue type, the
//! recovery engine may consult an external generator (in production, an
//! LLM) to synthesize a workflow from the failure description. The
//! generated workflow is executed exactly like a catalog one; if generation
//! itself fails, the pipeline goes to `Failed` rather than retrying
//! indefinitely.

use async_trait::async_trait;

use crate::error::{RecoveryError, RecoveryResult};
use crate::issue::FailureReport;
use crate::workflow::Workflow;

/// Port for synthesizing a recovery workflow from a failure description.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowGenerator: Send + Sync {
    async fn generate(&self, report: &FailureReport) -> RecoveryResult<Workflow>;
}

/// Generator that always declines.
///
/// Pipelines wired without an LLM use this; unclassifiable failures then
/// go straight to `Failed`.
#[derive(Debug, Default)]
pub struct NullWorkflowGenerator;

impl NullWorkflowGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WorkflowGenerator for NullWorkflowGenerator {
    async fn generate(&self, report: &FailureReport) -> RecoveryResult<Workflow> {
        Err(RecoveryError::GenerationFailed(format!(
            "no generator configured (failure: {})",
            report.description
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_generator_declines() {
        let generator = NullWorkflowGenerator::new();
        let err = generator
            .generate(&FailureReport::new("strange failure"))
            .await
            .unwrap_err();
        assert!(matches!(err, RecoveryError::GenerationFailed(_)));
    }
}
