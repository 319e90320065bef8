//! Handlers for build, test, and dependency failures.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::context::ActionContext;
use crate::error::RecoveryResult;
use crate::handlers::RecoveryHandler;
use crate::ports::BuildTools;

/// Installs the package named by the `package` context key.
pub struct InstallDependencyHandler {
    build: Arc<dyn BuildTools>,
}

impl InstallDependencyHandler {
    pub fn new(build: Arc<dyn BuildTools>) -> Self {
        Self { build }
    }
}

#[async_trait]
impl RecoveryHandler for InstallDependencyHandler {
    fn name(&self) -> &str {
        "install_missing_dependency"
    }

    async fn handle(&self, ctx: &mut ActionContext) -> RecoveryResult<bool> {
        let Some(package) = ctx.get_str("package") else {
            warn!("install_missing_dependency: no 'package' in context");
            return Ok(false);
        };
        let package = package.to_string();
        info!("Installing missing dependency '{}'", package);
        Ok(self.build.install_package(&package, None).await)
    }
}

/// Reinstalls the `package` context key pinned to the `version` key,
/// resolving a version conflict.
pub struct PinVersionHandler {
    build: Arc<dyn BuildTools>,
}

impl PinVersionHandler {
    pub fn new(build: Arc<dyn BuildTools>) -> Self {
        Self { build }
    }
}

#[async_trait]
impl RecoveryHandler for PinVersionHandler {
    fn name(&self) -> &str {
        "pin_dependency_version"
    }

    async fn handle(&self, ctx: &mut ActionContext) -> RecoveryResult<bool> {
        let Some(package) = ctx.get_str("package") else {
            warn!("pin_dependency_version: no 'package' in context");
            return Ok(false);
        };
        let package = package.to_string();
        let version = ctx.get_str("version").map(String::from);
        info!(
            "Pinning '{}' to version {}",
            package,
            version.as_deref().unwrap_or("latest compatible")
        );
        Ok(self.build.install_package(&package, version.as_deref()).await)
    }
}

/// Rebuilds the workspace from a clean slate.
pub struct RebuildProjectHandler {
    build: Arc<dyn BuildTools>,
}

impl RebuildProjectHandler {
    pub fn new(build: Arc<dyn BuildTools>) -> Self {
        Self { build }
    }
}

#[async_trait]
impl RecoveryHandler for RebuildProjectHandler {
    fn name(&self) -> &str {
        "rebuild_project"
    }

    async fn handle(&self, _ctx: &mut ActionContext) -> RecoveryResult<bool> {
        info!("Rebuilding project");
        Ok(self.build.rebuild().await)
    }
}

/// Reruns the test suite after a fix has been applied.
pub struct RerunTestsHandler {
    build: Arc<dyn BuildTools>,
}

impl RerunTestsHandler {
    pub fn new(build: Arc<dyn BuildTools>) -> Self {
        Self { build }
    }
}

#[async_trait]
impl RecoveryHandler for RerunTestsHandler {
    fn name(&self) -> &str {
        "rerun_tests"
    }

    async fn handle(&self, _ctx: &mut ActionContext) -> RecoveryResult<bool> {
        info!("Re-running test suite");
        Ok(self.build.run_tests().await)
    }
}

/// Applies the linter's autofixes.
pub struct ApplyLintFixesHandler {
    build: Arc<dyn BuildTools>,
}

impl ApplyLintFixesHandler {
    pub fn new(build: Arc<dyn BuildTools>) -> Self {
        Self { build }
    }
}

#[async_trait]
impl RecoveryHandler for ApplyLintFixesHandler {
    fn name(&self) -> &str {
        "apply_lint_fixes"
    }

    async fn handle(&self, _ctx: &mut ActionContext) -> RecoveryResult<bool> {
        info!("Applying lint autofixes");
        Ok(self.build.apply_lint_fixes().await)
    }
}

/// Upgrades dependencies flagged by the security audit.
pub struct PatchVulnerabilityHandler {
    build: Arc<dyn BuildTools>,
}

impl PatchVulnerabilityHandler {
    pub fn new(build: Arc<dyn BuildTools>) -> Self {
        Self { build }
    }
}

#[async_trait]
impl RecoveryHandler for PatchVulnerabilityHandler {
    fn name(&self) -> &str {
        "patch_vulnerability"
    }

    async fn handle(&self, _ctx: &mut ActionContext) -> RecoveryResult<bool> {
        info!("Patching audited vulnerabilities");
        Ok(self.build.audit_fix().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPorts;

    #[tokio::test]
    async fn test_install_requires_package_key() {
        let ports = MockPorts::succeeding();
        let handler = InstallDependencyHandler::new(ports.clone());

        let mut ctx = ActionContext::new("card-1");
        assert!(!handler.handle(&mut ctx).await.unwrap());
        assert_eq!(ports.calls("install_package"), 0);

        ctx.set("package", serde_json::json!("requests"));
        assert!(handler.handle(&mut ctx).await.unwrap());
        assert_eq!(ports.calls("install_package"), 1);
    }

    #[tokio::test]
    async fn test_pin_version_passes_version_through() {
        let ports = MockPorts::succeeding();
        let handler = PinVersionHandler::new(ports.clone());

        let mut ctx = ActionContext::new("card-1")
            .with_value("package", serde_json::json!("urllib3"))
            .with_value("version", serde_json::json!("1.26.18"));
        assert!(handler.handle(&mut ctx).await.unwrap());
        assert_eq!(
            ports.last_install(),
            Some(("urllib3".to_string(), Some("1.26.18".to_string())))
        );
    }
}
