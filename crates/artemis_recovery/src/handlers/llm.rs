//! Handlers for LLM client failures.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::context::ActionContext;
use crate::error::RecoveryResult;
use crate::handlers::RecoveryHandler;
use crate::ports::LlmGateway;

const DEFAULT_THROTTLE_SECS: u64 = 30;

/// Replays the failed LLM call through the gateway's own retry logic.
pub struct RetryLlmCallHandler {
    llm: Arc<dyn LlmGateway>,
}

impl RetryLlmCallHandler {
    pub fn new(llm: Arc<dyn LlmGateway>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl RecoveryHandler for RetryLlmCallHandler {
    fn name(&self) -> &str {
        "retry_llm_call"
    }

    async fn handle(&self, _ctx: &mut ActionContext) -> RecoveryResult<bool> {
        info!("Retrying last LLM call");
        Ok(self.llm.retry_last_call().await)
    }
}

/// Switches the gateway to its fallback provider.
pub struct SwitchLlmProviderHandler {
    llm: Arc<dyn LlmGateway>,
}

impl SwitchLlmProviderHandler {
    pub fn new(llm: Arc<dyn LlmGateway>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl RecoveryHandler for SwitchLlmProviderHandler {
    fn name(&self) -> &str {
        "switch_llm_provider"
    }

    async fn handle(&self, _ctx: &mut ActionContext) -> RecoveryResult<bool> {
        info!("Switching LLM provider");
        Ok(self.llm.switch_provider().await)
    }
}

/// Backs off the request rate; the pause length comes from the
/// `throttle_secs` context key when present.
pub struct ThrottleLlmRequestsHandler {
    llm: Arc<dyn LlmGateway>,
}

impl ThrottleLlmRequestsHandler {
    pub fn new(llm: Arc<dyn LlmGateway>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl RecoveryHandler for ThrottleLlmRequestsHandler {
    fn name(&self) -> &str {
        "throttle_llm_requests"
    }

    async fn handle(&self, ctx: &mut ActionContext) -> RecoveryResult<bool> {
        let seconds = ctx.get_u64("throttle_secs").unwrap_or(DEFAULT_THROTTLE_SECS);
        info!("Throttling LLM requests for {}s", seconds);
        Ok(self.llm.throttle(seconds).await)
    }
}

/// Asks the gateway to re-extract a structured result from the last raw
/// response before burning tokens on a fresh call.
pub struct ReparseLlmResponseHandler {
    llm: Arc<dyn LlmGateway>,
}

impl ReparseLlmResponseHandler {
    pub fn new(llm: Arc<dyn LlmGateway>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl RecoveryHandler for ReparseLlmResponseHandler {
    fn name(&self) -> &str {
        "reparse_llm_response"
    }

    async fn handle(&self, _ctx: &mut ActionContext) -> RecoveryResult<bool> {
        info!("Re-parsing last LLM response");
        Ok(self.llm.reparse_last_response().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPorts;

    #[tokio::test]
    async fn test_throttle_uses_context_override() {
        let ports = MockPorts::succeeding();
        let handler = ThrottleLlmRequestsHandler::new(ports.clone());

        let mut ctx = ActionContext::new("card-1").with_value("throttle_secs", serde_json::json!(90));
        assert!(handler.handle(&mut ctx).await.unwrap());
        assert_eq!(ports.last_throttle(), Some(90));
    }

    #[tokio::test]
    async fn test_retry_reflects_gateway_outcome() {
        let mut ctx = ActionContext::new("card-1");
        assert!(RetryLlmCallHandler::new(MockPorts::succeeding())
            .handle(&mut ctx)
            .await
            .unwrap());
        assert!(!RetryLlmCallHandler::new(MockPorts::failing())
            .handle(&mut ctx)
            .await
            .unwrap());
    }
}
