//! Scripted collaborator ports and handlers for testing.
//!
//! Provides configurable in-memory implementations of every recovery port
//! so that workflow and pipeline tests can run without real processes,
//! package managers, or LLM providers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::context::ActionContext;
use crate::error::{RecoveryError, RecoveryResult};
use crate::handlers::RecoveryHandler;
use crate::ports::{
    AgentCoordination, BuildTools, DataStore, LlmGateway, ProcessControl, RecoveryEnvironment,
    SystemResources,
};

/// One object implementing every collaborator port, with per-method call
/// counting and a single scripted outcome.
pub struct MockPorts {
    succeed: bool,
    calls: Mutex<HashMap<&'static str, usize>>,
    last_install: Mutex<Option<(String, Option<String>)>>,
    last_throttle: Mutex<Option<u64>>,
    last_card: Mutex<Option<String>>,
}

impl MockPorts {
    /// Ports whose every operation succeeds.
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self::new(true))
    }

    /// Ports whose every operation fails (expected-failure style).
    pub fn failing() -> Arc<Self> {
        Arc::new(Self::new(false))
    }

    fn new(succeed: bool) -> Self {
        Self {
            succeed,
            calls: Mutex::new(HashMap::new()),
            last_install: Mutex::new(None),
            last_throttle: Mutex::new(None),
            last_card: Mutex::new(None),
        }
    }

    /// A `RecoveryEnvironment` backed entirely by these ports.
    pub fn environment(ports: &Arc<Self>) -> RecoveryEnvironment {
        RecoveryEnvironment::new(
            ports.clone(),
            ports.clone(),
            ports.clone(),
            ports.clone(),
            ports.clone(),
            ports.clone(),
        )
    }

    /// Number of calls made to the named port method.
    pub fn calls(&self, method: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(method).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn last_install(&self) -> Option<(String, Option<String>)> {
        self.last_install.lock().ok().and_then(|v| v.clone())
    }

    pub fn last_throttle(&self) -> Option<u64> {
        self.last_throttle.lock().ok().and_then(|v| *v)
    }

    pub fn last_card(&self) -> Option<String> {
        self.last_card.lock().ok().and_then(|v| v.clone())
    }

    fn record(&self, method: &'static str) -> bool {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(method).or_insert(0) += 1;
        }
        self.succeed
    }
}

#[async_trait]
impl ProcessControl for MockPorts {
    async fn terminate(&self, _pid: u32) -> bool {
        self.record("terminate")
    }

    async fn reap_zombies(&self) -> usize {
        self.record("reap_zombies");
        if self.succeed {
            2
        } else {
            0
        }
    }

    async fn release_lock(&self, _path: &str) -> bool {
        self.record("release_lock")
    }
}

#[async_trait]
impl SystemResources for MockPorts {
    async fn free_memory(&self) -> bool {
        self.record("free_memory")
    }

    async fn purge_disk(&self) -> bool {
        self.record("purge_disk")
    }

    async fn network_reachable(&self) -> bool {
        self.record("network_reachable")
    }

    async fn fix_permissions(&self, _path: &str) -> bool {
        self.record("fix_permissions")
    }
}

#[async_trait]
impl BuildTools for MockPorts {
    async fn install_package(&self, package: &str, version: Option<&str>) -> bool {
        if let Ok(mut last) = self.last_install.lock() {
            *last = Some((package.to_string(), version.map(String::from)));
        }
        self.record("install_package")
    }

    async fn rebuild(&self) -> bool {
        self.record("rebuild")
    }

    async fn run_tests(&self) -> bool {
        self.record("run_tests")
    }

    async fn apply_lint_fixes(&self) -> bool {
        self.record("apply_lint_fixes")
    }

    async fn audit_fix(&self) -> bool {
        self.record("audit_fix")
    }
}

#[async_trait]
impl LlmGateway for MockPorts {
    async fn retry_last_call(&self) -> bool {
        self.record("retry_last_call")
    }

    async fn switch_provider(&self) -> bool {
        self.record("switch_provider")
    }

    async fn throttle(&self, seconds: u64) -> bool {
        if let Ok(mut last) = self.last_throttle.lock() {
            *last = Some(seconds);
        }
        self.record("throttle")
    }

    async fn reparse_last_response(&self) -> bool {
        self.record("reparse_last_response")
    }
}

#[async_trait]
impl DataStore for MockPorts {
    async fn restore_backup(&self, card_id: &str) -> bool {
        if let Ok(mut last) = self.last_card.lock() {
            *last = Some(card_id.to_string());
        }
        self.record("restore_backup")
    }

    async fn rebuild_index(&self) -> bool {
        self.record("rebuild_index")
    }

    async fn verify_integrity(&self) -> bool {
        self.record("verify_integrity")
    }

    async fn reset_card(&self, card_id: &str) -> bool {
        if let Ok(mut last) = self.last_card.lock() {
            *last = Some(card_id.to_string());
        }
        self.record("reset_card")
    }
}

#[async_trait]
impl AgentCoordination for MockPorts {
    async fn arbitrate(&self, _stage: &str) -> bool {
        self.record("arbitrate")
    }

    async fn restart_messenger(&self) -> bool {
        self.record("restart_messenger")
    }

    async fn reset_agents(&self, _stage: &str) -> bool {
        self.record("reset_agents")
    }
}

/// Handler with a fixed outcome and an invocation counter, for retry
/// boundary tests.
pub struct CountingHandler {
    name: String,
    outcome: bool,
    calls: AtomicUsize,
}

impl CountingHandler {
    pub fn succeeding(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            outcome: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            outcome: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecoveryHandler for CountingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, _ctx: &mut ActionContext) -> RecoveryResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.outcome)
    }
}

/// Handler that fails a fixed number of times, then succeeds.
pub struct FlakyHandler {
    name: String,
    failures_remaining: AtomicUsize,
    calls: AtomicUsize,
}

impl FlakyHandler {
    pub fn new(name: impl Into<String>, failures: usize) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            failures_remaining: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecoveryHandler for FlakyHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, _ctx: &mut ActionContext) -> RecoveryResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Ok(false);
        }
        Ok(true)
    }
}

/// Handler that always returns an unexpected fault.
pub struct FaultyHandler {
    name: String,
    calls: AtomicUsize,
}

impl FaultyHandler {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecoveryHandler for FaultyHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, _ctx: &mut ActionContext) -> RecoveryResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RecoveryError::HandlerFault(format!(
            "{}: injected fault",
            self.name
        )))
    }
}
