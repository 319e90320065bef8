//! Machine configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default order of the development pipeline stages.
pub const DEFAULT_STAGES: &[&str] = &[
    "requirements",
    "architecture",
    "sprint_planning",
    "development",
    "code_review",
    "testing",
    "retrospective",
];

/// Configuration for an `ArtemisStateMachine`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Consecutive failures before a stage's circuit opens.
    pub failure_threshold: u32,
    /// Root directory for the file checkpoint store. `None` disables
    /// file-backed checkpointing unless a store is injected explicitly.
    pub checkpoint_root: Option<PathBuf>,
    /// Planned stage order for this pipeline.
    pub stages: Vec<String>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            checkpoint_root: None,
            stages: DEFAULT_STAGES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl MachineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn checkpoint_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.checkpoint_root = Some(root.into());
        self
    }

    pub fn stages(mut self, stages: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.stages = stages.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MachineConfig::default();
        assert_eq!(config.failure_threshold, 3);
        assert!(config.checkpoint_root.is_none());
        assert_eq!(config.stages.len(), 7);
        assert_eq!(config.stages[0], "requirements");
    }

    #[test]
    fn test_builder_methods() {
        let config = MachineConfig::new()
            .failure_threshold(5)
            .checkpoint_root("/tmp/artemis")
            .stages(["development", "testing"]);

        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.checkpoint_root, Some(PathBuf::from("/tmp/artemis")));
        assert_eq!(config.stages, vec!["development", "testing"]);
    }
}
