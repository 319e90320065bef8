//! Handlers for pipeline data: state backups, the RAG index, kanban cards.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::context::ActionContext;
use crate::error::RecoveryResult;
use crate::handlers::RecoveryHandler;
use crate::ports::DataStore;

/// Restores pipeline state for this card from the last good backup.
///
/// The restore itself is the recovery; workflows using this handler
/// disable the executor's additional rollback to avoid a double revert.
pub struct RestoreStateBackupHandler {
    data: Arc<dyn DataStore>,
}

impl RestoreStateBackupHandler {
    pub fn new(data: Arc<dyn DataStore>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl RecoveryHandler for RestoreStateBackupHandler {
    fn name(&self) -> &str {
        "restore_state_backup"
    }

    async fn handle(&self, ctx: &mut ActionContext) -> RecoveryResult<bool> {
        info!("Restoring state backup for card '{}'", ctx.card_id);
        let card_id = ctx.card_id.clone();
        Ok(self.data.restore_backup(&card_id).await)
    }
}

/// Rebuilds the RAG vector index from source documents.
pub struct RebuildRagIndexHandler {
    data: Arc<dyn DataStore>,
}

impl RebuildRagIndexHandler {
    pub fn new(data: Arc<dyn DataStore>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl RecoveryHandler for RebuildRagIndexHandler {
    fn name(&self) -> &str {
        "rebuild_rag_index"
    }

    async fn handle(&self, _ctx: &mut ActionContext) -> RecoveryResult<bool> {
        info!("Rebuilding RAG index");
        Ok(self.data.rebuild_index().await)
    }
}

/// Verifies stored pipeline data before anything is retried on top of it.
pub struct VerifyIntegrityHandler {
    data: Arc<dyn DataStore>,
}

impl VerifyIntegrityHandler {
    pub fn new(data: Arc<dyn DataStore>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl RecoveryHandler for VerifyIntegrityHandler {
    fn name(&self) -> &str {
        "verify_data_integrity"
    }

    async fn handle(&self, _ctx: &mut ActionContext) -> RecoveryResult<bool> {
        info!("Verifying data integrity");
        Ok(self.data.verify_integrity().await)
    }
}

/// Resets the kanban card to a consistent description.
pub struct ResetCardHandler {
    data: Arc<dyn DataStore>,
}

impl ResetCardHandler {
    pub fn new(data: Arc<dyn DataStore>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl RecoveryHandler for ResetCardHandler {
    fn name(&self) -> &str {
        "reset_kanban_card"
    }

    async fn handle(&self, ctx: &mut ActionContext) -> RecoveryResult<bool> {
        info!("Resetting kanban card '{}'", ctx.card_id);
        let card_id = ctx.card_id.clone();
        Ok(self.data.reset_card(&card_id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPorts;

    #[tokio::test]
    async fn test_restore_backup_uses_card_id() {
        let ports = MockPorts::succeeding();
        let handler = RestoreStateBackupHandler::new(ports.clone());

        let mut ctx = ActionContext::new("card-77");
        assert!(handler.handle(&mut ctx).await.unwrap());
        assert_eq!(ports.last_card(), Some("card-77".to_string()));
    }
}
