//! Handlers for multi-agent coordination failures.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::context::ActionContext;
use crate::error::RecoveryResult;
use crate::handlers::RecoveryHandler;
use crate::ports::AgentCoordination;

/// Escalates a deadlocked or conflicting stage to the arbitration agent.
pub struct ArbitrateConflictHandler {
    agents: Arc<dyn AgentCoordination>,
}

impl ArbitrateConflictHandler {
    pub fn new(agents: Arc<dyn AgentCoordination>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl RecoveryHandler for ArbitrateConflictHandler {
    fn name(&self) -> &str {
        "arbitrate_conflict"
    }

    async fn handle(&self, ctx: &mut ActionContext) -> RecoveryResult<bool> {
        let Some(stage) = ctx.stage_name.clone() else {
            warn!("arbitrate_conflict: no stage in context");
            return Ok(false);
        };
        info!("Escalating stage '{}' to arbitration", stage);
        Ok(self.agents.arbitrate(&stage).await)
    }
}

/// Restarts the inter-agent messenger.
pub struct RestartMessengerHandler {
    agents: Arc<dyn AgentCoordination>,
}

impl RestartMessengerHandler {
    pub fn new(agents: Arc<dyn AgentCoordination>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl RecoveryHandler for RestartMessengerHandler {
    fn name(&self) -> &str {
        "restart_messenger"
    }

    async fn handle(&self, _ctx: &mut ActionContext) -> RecoveryResult<bool> {
        info!("Restarting agent messenger");
        Ok(self.agents.restart_messenger().await)
    }
}

/// Resets the agents assigned to the failed stage to a clean roster.
pub struct ResetStageAgentsHandler {
    agents: Arc<dyn AgentCoordination>,
}

impl ResetStageAgentsHandler {
    pub fn new(agents: Arc<dyn AgentCoordination>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl RecoveryHandler for ResetStageAgentsHandler {
    fn name(&self) -> &str {
        "reset_stage_agents"
    }

    async fn handle(&self, ctx: &mut ActionContext) -> RecoveryResult<bool> {
        let Some(stage) = ctx.stage_name.clone() else {
            warn!("reset_stage_agents: no stage in context");
            return Ok(false);
        };
        info!("Resetting agents for stage '{}'", stage);
        Ok(self.agents.reset_agents(&stage).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPorts;

    #[tokio::test]
    async fn test_arbitrate_requires_stage() {
        let ports = MockPorts::succeeding();
        let handler = ArbitrateConflictHandler::new(ports.clone());

        let mut bare = ActionContext::new("card-1");
        assert!(!handler.handle(&mut bare).await.unwrap());
        assert_eq!(ports.calls("arbitrate"), 0);

        let mut ctx = ActionContext::new("card-1").with_stage("development");
        assert!(handler.handle(&mut ctx).await.unwrap());
        assert_eq!(ports.calls("arbitrate"), 1);
    }
}
