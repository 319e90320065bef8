//! Handlers for host resources, timeouts, and stage rerun bookkeeping.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::context::ActionContext;
use crate::error::RecoveryResult;
use crate::handlers::RecoveryHandler;
use crate::ports::SystemResources;

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const MAX_TIMEOUT_SECS: u64 = 3600;

/// Releases memory held by caches and idle workers.
pub struct FreeMemoryHandler {
    system: Arc<dyn SystemResources>,
}

impl FreeMemoryHandler {
    pub fn new(system: Arc<dyn SystemResources>) -> Self {
        Self { system }
    }
}

#[async_trait]
impl RecoveryHandler for FreeMemoryHandler {
    fn name(&self) -> &str {
        "free_memory"
    }

    async fn handle(&self, _ctx: &mut ActionContext) -> RecoveryResult<bool> {
        info!("Freeing memory");
        Ok(self.system.free_memory().await)
    }
}

/// Purges temporary artifacts to reclaim disk space.
pub struct PurgeDiskHandler {
    system: Arc<dyn SystemResources>,
}

impl PurgeDiskHandler {
    pub fn new(system: Arc<dyn SystemResources>) -> Self {
        Self { system }
    }
}

#[async_trait]
impl RecoveryHandler for PurgeDiskHandler {
    fn name(&self) -> &str {
        "purge_disk_space"
    }

    async fn handle(&self, _ctx: &mut ActionContext) -> RecoveryResult<bool> {
        info!("Purging disk space");
        Ok(self.system.purge_disk().await)
    }
}

/// Probes network reachability before the failed operation is retried.
pub struct ProbeNetworkHandler {
    system: Arc<dyn SystemResources>,
}

impl ProbeNetworkHandler {
    pub fn new(system: Arc<dyn SystemResources>) -> Self {
        Self { system }
    }
}

#[async_trait]
impl RecoveryHandler for ProbeNetworkHandler {
    fn name(&self) -> &str {
        "probe_network"
    }

    async fn handle(&self, _ctx: &mut ActionContext) -> RecoveryResult<bool> {
        Ok(self.system.network_reachable().await)
    }
}

/// Fixes permissions on the path named by the `file_path` context key.
pub struct FixPermissionsHandler {
    system: Arc<dyn SystemResources>,
}

impl FixPermissionsHandler {
    pub fn new(system: Arc<dyn SystemResources>) -> Self {
        Self { system }
    }
}

#[async_trait]
impl RecoveryHandler for FixPermissionsHandler {
    fn name(&self) -> &str {
        "fix_permissions"
    }

    async fn handle(&self, ctx: &mut ActionContext) -> RecoveryResult<bool> {
        let Some(path) = ctx.get_str("file_path") else {
            warn!("fix_permissions: no 'file_path' in context");
            return Ok(false);
        };
        let path = path.to_string();
        info!("Fixing permissions on {}", path);
        Ok(self.system.fix_permissions(&path).await)
    }
}

/// Doubles the `timeout_secs` context value, capped at one hour.
///
/// Pure context manipulation: the raised timeout takes effect when the
/// orchestrator reruns the stage with this context.
pub struct IncreaseTimeoutHandler;

impl IncreaseTimeoutHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for IncreaseTimeoutHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecoveryHandler for IncreaseTimeoutHandler {
    fn name(&self) -> &str {
        "increase_timeout"
    }

    async fn handle(&self, ctx: &mut ActionContext) -> RecoveryResult<bool> {
        let current = ctx.get_u64("timeout_secs").unwrap_or(DEFAULT_TIMEOUT_SECS);
        let raised = (current * 2).min(MAX_TIMEOUT_SECS);
        ctx.set("timeout_secs", serde_json::json!(raised));
        info!("Raised stage timeout {}s → {}s", current, raised);
        Ok(raised > current)
    }
}

/// Flags the failed stage for a fresh run with regenerated inputs.
pub struct MarkStageForRerunHandler;

impl MarkStageForRerunHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MarkStageForRerunHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecoveryHandler for MarkStageForRerunHandler {
    fn name(&self) -> &str {
        "mark_stage_for_rerun"
    }

    async fn handle(&self, ctx: &mut ActionContext) -> RecoveryResult<bool> {
        let Some(stage) = ctx.stage_name.clone() else {
            warn!("mark_stage_for_rerun: no stage in context");
            return Ok(false);
        };
        ctx.set("rerun_stage", serde_json::json!(stage));
        info!("Marked stage '{}' for rerun", stage);
        Ok(true)
    }
}
