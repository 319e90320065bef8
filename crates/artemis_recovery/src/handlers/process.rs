//! Handlers for stuck and leftover processes.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::context::ActionContext;
use crate::error::RecoveryResult;
use crate::handlers::RecoveryHandler;
use crate::ports::ProcessControl;

/// Terminates the hung process named by the `pid` context key.
pub struct KillHangingProcessHandler {
    process: Arc<dyn ProcessControl>,
}

impl KillHangingProcessHandler {
    pub fn new(process: Arc<dyn ProcessControl>) -> Self {
        Self { process }
    }
}

#[async_trait]
impl RecoveryHandler for KillHangingProcessHandler {
    fn name(&self) -> &str {
        "kill_hanging_process"
    }

    async fn handle(&self, ctx: &mut ActionContext) -> RecoveryResult<bool> {
        let Some(pid) = ctx.get_u64("pid") else {
            warn!("kill_hanging_process: no 'pid' in context");
            return Ok(false);
        };
        info!("Terminating hung process {}", pid);
        Ok(self.process.terminate(pid as u32).await)
    }
}

/// Reaps zombie children left behind by crashed stage workers.
pub struct ReapZombiesHandler {
    process: Arc<dyn ProcessControl>,
}

impl ReapZombiesHandler {
    pub fn new(process: Arc<dyn ProcessControl>) -> Self {
        Self { process }
    }
}

#[async_trait]
impl RecoveryHandler for ReapZombiesHandler {
    fn name(&self) -> &str {
        "reap_zombie_processes"
    }

    async fn handle(&self, ctx: &mut ActionContext) -> RecoveryResult<bool> {
        let reaped = self.process.reap_zombies().await;
        info!("Reaped {} zombie process(es)", reaped);
        ctx.set("zombies_reaped", serde_json::json!(reaped));
        // Nothing to reap still counts as a clean state.
        Ok(true)
    }
}

/// Releases the stale lock on the file named by the `file_path` context key.
pub struct ReleaseFileLockHandler {
    process: Arc<dyn ProcessControl>,
}

impl ReleaseFileLockHandler {
    pub fn new(process: Arc<dyn ProcessControl>) -> Self {
        Self { process }
    }
}

#[async_trait]
impl RecoveryHandler for ReleaseFileLockHandler {
    fn name(&self) -> &str {
        "release_file_lock"
    }

    async fn handle(&self, ctx: &mut ActionContext) -> RecoveryResult<bool> {
        let Some(path) = ctx.get_str("file_path") else {
            warn!("release_file_lock: no 'file_path' in context");
            return Ok(false);
        };
        let path = path.to_string();
        info!("Releasing file lock on {}", path);
        Ok(self.process.release_lock(&path).await)
    }
}
