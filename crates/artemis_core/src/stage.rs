//! Per-stage state tracking, independent of the top-level pipeline state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::state::StageState;

/// Timing, retry, and metadata record for one named stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageStateInfo {
    pub stage_name: String,
    pub state: StageState,
    /// Absent when the entry was reconstructed from a checkpoint.
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
    pub retry_count: u32,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl StageStateInfo {
    fn new(stage_name: impl Into<String>, state: StageState) -> Self {
        Self {
            stage_name: stage_name.into(),
            state,
            started_at: Some(Utc::now()),
            ended_at: None,
            duration_seconds: None,
            retry_count: 0,
            metadata: HashMap::new(),
        }
    }
}

/// Tracks the state of every stage seen during a pipeline run.
///
/// The active stage marker is advisory, for observability only; it is not
/// enforced against updates to other stages.
#[derive(Debug, Default)]
pub struct StageStateManager {
    stages: HashMap<String, StageStateInfo>,
    active_stage: Option<String>,
}

impl StageStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update (or create) the state entry for `stage_name`.
    ///
    /// A first sighting creates the entry with `started_at = now`. A
    /// transition into a terminal stage state computes the duration,
    /// guarded on the start time being known. Metadata merges into the
    /// existing map; it never replaces it wholesale.
    pub fn update_stage_state(
        &mut self,
        stage_name: &str,
        state: StageState,
        metadata: HashMap<String, serde_json::Value>,
    ) {
        let info = self
            .stages
            .entry(stage_name.to_string())
            .or_insert_with(|| StageStateInfo::new(stage_name, state));

        debug!("Stage '{}' → {}", stage_name, state);
        info.state = state;

        if state.is_terminal() {
            let ended = Utc::now();
            info.ended_at = Some(ended);
            if let Some(started) = info.started_at {
                info.duration_seconds = Some((ended - started).num_milliseconds() as f64 / 1000.0);
            }
        }

        info.metadata.extend(metadata);
    }

    /// Increment the retry counter for a stage and mark it retrying.
    pub fn record_retry(&mut self, stage_name: &str) {
        self.update_stage_state(stage_name, StageState::Retrying, HashMap::new());
        if let Some(info) = self.stages.get_mut(stage_name) {
            info.retry_count += 1;
        }
    }

    /// Reconstruct a stage entry from persisted data, without timing.
    ///
    /// Used on checkpoint resume, where completion is known but the
    /// original start time is not.
    pub fn restore_stage(&mut self, stage_name: &str, state: StageState) {
        let mut info = StageStateInfo::new(stage_name, state);
        info.started_at = None;
        self.stages.insert(stage_name.to_string(), info);
    }

    pub fn set_active_stage(&mut self, stage_name: Option<&str>) {
        self.active_stage = stage_name.map(String::from);
    }

    pub fn active_stage(&self) -> Option<&str> {
        self.active_stage.as_deref()
    }

    pub fn get(&self, stage_name: &str) -> Option<&StageStateInfo> {
        self.stages.get(stage_name)
    }

    pub fn stages(&self) -> impl Iterator<Item = &StageStateInfo> {
        self.stages.values()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Names of stages whose circuit is currently open.
    pub fn circuit_open_stages(&self) -> Vec<String> {
        self.stages
            .values()
            .filter(|info| info.state == StageState::CircuitOpen)
            .map(|info| info.stage_name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_update_creates_entry_with_start_time() {
        let mut manager = StageStateManager::new();
        manager.update_stage_state("development", StageState::Running, HashMap::new());

        let info = manager.get("development").unwrap();
        assert_eq!(info.state, StageState::Running);
        assert!(info.started_at.is_some());
        assert!(info.ended_at.is_none());
        assert!(info.duration_seconds.is_none());
    }

    #[test]
    fn test_completion_computes_non_negative_duration() {
        let mut manager = StageStateManager::new();
        manager.update_stage_state("development", StageState::Running, HashMap::new());
        manager.update_stage_state("development", StageState::Completed, HashMap::new());

        let info = manager.get("development").unwrap();
        assert_eq!(info.state, StageState::Completed);
        assert!(info.ended_at.is_some());
        let duration = info.duration_seconds.unwrap();
        assert!(duration >= 0.0);
        let span = (info.ended_at.unwrap() - info.started_at.unwrap()).num_milliseconds() as f64
            / 1000.0;
        assert!((duration - span).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_start_time_skips_duration() {
        let mut manager = StageStateManager::new();
        manager.restore_stage("architecture", StageState::Running);
        manager.update_stage_state("architecture", StageState::Failed, HashMap::new());

        let info = manager.get("architecture").unwrap();
        assert!(info.ended_at.is_some());
        assert!(info.duration_seconds.is_none());
    }

    #[test]
    fn test_metadata_merges_instead_of_replacing() {
        let mut manager = StageStateManager::new();
        let mut first = HashMap::new();
        first.insert("agent".to_string(), serde_json::json!("developer-1"));
        manager.update_stage_state("development", StageState::Running, first);

        let mut second = HashMap::new();
        second.insert("attempt".to_string(), serde_json::json!(2));
        manager.update_stage_state("development", StageState::Retrying, second);

        let info = manager.get("development").unwrap();
        assert_eq!(info.metadata["agent"], "developer-1");
        assert_eq!(info.metadata["attempt"], 2);
    }

    #[test]
    fn test_record_retry_increments_counter() {
        let mut manager = StageStateManager::new();
        manager.update_stage_state("testing", StageState::Running, HashMap::new());
        manager.record_retry("testing");
        manager.record_retry("testing");

        let info = manager.get("testing").unwrap();
        assert_eq!(info.retry_count, 2);
        assert_eq!(info.state, StageState::Retrying);
    }

    #[test]
    fn test_active_stage_is_advisory() {
        let mut manager = StageStateManager::new();
        assert!(manager.active_stage().is_none());

        manager.set_active_stage(Some("code_review"));
        assert_eq!(manager.active_stage(), Some("code_review"));

        manager.set_active_stage(None);
        assert!(manager.active_stage().is_none());
    }

    #[test]
    fn test_circuit_open_stages_query() {
        let mut manager = StageStateManager::new();
        manager.update_stage_state("architecture", StageState::Completed, HashMap::new());
        manager.update_stage_state("development", StageState::CircuitOpen, HashMap::new());
        manager.update_stage_state("testing", StageState::CircuitOpen, HashMap::new());

        let mut open = manager.circuit_open_stages();
        open.sort();
        assert_eq!(open, vec!["development", "testing"]);
    }
}
