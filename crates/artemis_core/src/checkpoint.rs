//! Checkpoint persistence for crash recovery.
//!
//! A snapshot of pipeline progress is written after every terminal stage
//! transition so a crashed pipeline can resume from the last completed
//! stage instead of replaying the whole run.
//!
//! Checkpointing is best-effort by design: the store is optional, and a
//! store that is absent or failing degrades every operation to a logged
//! no-op. Losing the ability to checkpoint must never crash the pipeline,
//! only its resumability.
//!
//! On disk, the file store keeps one JSON document per card:
//!
//! ```text
//! <root>/.artemis/checkpoints/<card_id>.json
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StateError, StateResult};
use crate::state::StageState;

/// Overall status recorded in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    InProgress,
    Completed,
    Failed,
    Aborted,
}

/// Persisted record of pipeline progress for one card.
///
/// Must round-trip losslessly through the checkpoint store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    pub card_id: String,
    pub total_stages: usize,
    pub stages_completed: Vec<String>,
    pub stage_results: HashMap<String, serde_json::Value>,
    pub current_stage: Option<String>,
    pub status: SnapshotStatus,
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PipelineSnapshot {
    pub fn new(card_id: impl Into<String>, total_stages: usize) -> Self {
        let now = Utc::now();
        Self {
            card_id: card_id.into(),
            total_stages,
            stages_completed: Vec::new(),
            stage_results: HashMap::new(),
            current_stage: None,
            status: SnapshotStatus::InProgress,
            context: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Fraction of stages completed, as a percentage.
    pub fn progress_percent(&self) -> f64 {
        if self.total_stages == 0 {
            return 0.0;
        }
        self.stages_completed.len() as f64 / self.total_stages as f64 * 100.0
    }
}

/// Progress summary derived from the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub progress_percent: f64,
    pub stages_completed: usize,
    pub total_stages: usize,
}

/// Persistence port for checkpoints.
///
/// Concurrent pipelines use disjoint card ids; the store namespaces on
/// `card_id` and performs no locking of its own.
pub trait CheckpointStore: Send + Sync {
    fn save(&self, snapshot: &PipelineSnapshot) -> StateResult<()>;
    fn load(&self, card_id: &str) -> StateResult<Option<PipelineSnapshot>>;
    fn delete(&self, card_id: &str) -> StateResult<()>;
}

/// File-backed checkpoint store, one JSON document per card.
pub struct FileCheckpointStore {
    root: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn checkpoint_path(&self, card_id: &str) -> PathBuf {
        self.root
            .join(".artemis")
            .join("checkpoints")
            .join(format!("{}.json", card_id))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&self, snapshot: &PipelineSnapshot) -> StateResult<()> {
        let path = self.checkpoint_path(&snapshot.card_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        fs::write(&path, json)?;
        debug!("Saved checkpoint for '{}' to {:?}", snapshot.card_id, path);
        Ok(())
    }

    fn load(&self, card_id: &str) -> StateResult<Option<PipelineSnapshot>> {
        let path = self.checkpoint_path(card_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let snapshot = serde_json::from_str(&content)
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        Ok(Some(snapshot))
    }

    fn delete(&self, card_id: &str) -> StateResult<()> {
        let path = self.checkpoint_path(card_id);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// In-memory checkpoint store for tests and ephemeral pipelines.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    snapshots: Mutex<HashMap<String, PipelineSnapshot>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn save(&self, snapshot: &PipelineSnapshot) -> StateResult<()> {
        let mut snapshots = self
            .snapshots
            .lock()
            .map_err(|_| StateError::Store("snapshot lock poisoned".to_string()))?;
        snapshots.insert(snapshot.card_id.clone(), snapshot.clone());
        Ok(())
    }

    fn load(&self, card_id: &str) -> StateResult<Option<PipelineSnapshot>> {
        let snapshots = self
            .snapshots
            .lock()
            .map_err(|_| StateError::Store("snapshot lock poisoned".to_string()))?;
        Ok(snapshots.get(card_id).cloned())
    }

    fn delete(&self, card_id: &str) -> StateResult<()> {
        let mut snapshots = self
            .snapshots
            .lock()
            .map_err(|_| StateError::Store("snapshot lock poisoned".to_string()))?;
        snapshots.remove(card_id);
        Ok(())
    }
}

/// Checkpointing facade used by the pipeline.
///
/// Holds the working snapshot in memory and persists it through the
/// optional store. Every operation is guarded: with no store configured,
/// writes are silent no-ops and reads return defaults.
pub struct CheckpointIntegration {
    card_id: String,
    store: Option<Arc<dyn CheckpointStore>>,
    snapshot: Option<PipelineSnapshot>,
}

impl CheckpointIntegration {
    pub fn new(card_id: impl Into<String>, store: Option<Arc<dyn CheckpointStore>>) -> Self {
        Self {
            card_id: card_id.into(),
            store,
            snapshot: None,
        }
    }

    pub fn card_id(&self) -> &str {
        &self.card_id
    }

    /// Start a fresh checkpoint for this card.
    pub fn create_checkpoint(
        &mut self,
        total_stages: usize,
        execution_context: HashMap<String, serde_json::Value>,
    ) {
        let mut snapshot = PipelineSnapshot::new(&self.card_id, total_stages);
        snapshot.context = execution_context;
        self.snapshot = Some(snapshot);
        self.persist();
    }

    /// Record the outcome of one stage and persist.
    pub fn save_stage_checkpoint(
        &mut self,
        stage_name: &str,
        state: StageState,
        result: Option<serde_json::Value>,
    ) {
        let Some(snapshot) = self.snapshot.as_mut() else {
            warn!("Stage checkpoint for '{}' skipped: no checkpoint created", stage_name);
            return;
        };

        snapshot.current_stage = Some(stage_name.to_string());
        if state == StageState::Completed && !snapshot.stages_completed.iter().any(|s| s == stage_name)
        {
            snapshot.stages_completed.push(stage_name.to_string());
        }
        if let Some(result) = result {
            snapshot.stage_results.insert(stage_name.to_string(), result);
        }
        snapshot.updated_at = Utc::now();
        self.persist();
    }

    /// Record the overall run status and persist.
    pub fn mark_status(&mut self, status: SnapshotStatus) {
        if let Some(snapshot) = self.snapshot.as_mut() {
            snapshot.status = status;
            snapshot.updated_at = Utc::now();
        }
        self.persist();
    }

    /// Whether a resumable checkpoint exists for this card.
    pub fn can_resume(&self) -> bool {
        match self.load_guarded() {
            Some(snapshot) => snapshot.status == SnapshotStatus::InProgress,
            None => false,
        }
    }

    /// Load the persisted snapshot and adopt it as the working copy.
    ///
    /// The caller is responsible for aligning pipeline state; this method
    /// never drives transitions itself.
    pub fn resume_from_checkpoint(&mut self) -> Option<PipelineSnapshot> {
        let snapshot = self.load_guarded()?;
        self.snapshot = Some(snapshot.clone());
        Some(snapshot)
    }

    /// Progress summary from the working snapshot.
    pub fn progress(&self) -> Progress {
        match &self.snapshot {
            Some(snapshot) => Progress {
                progress_percent: snapshot.progress_percent(),
                stages_completed: snapshot.stages_completed.len(),
                total_stages: snapshot.total_stages,
            },
            None => Progress {
                progress_percent: 0.0,
                stages_completed: 0,
                total_stages: 0,
            },
        }
    }

    pub fn snapshot(&self) -> Option<&PipelineSnapshot> {
        self.snapshot.as_ref()
    }

    fn persist(&self) {
        let (Some(store), Some(snapshot)) = (&self.store, &self.snapshot) else {
            return;
        };
        if let Err(e) = store.save(snapshot) {
            warn!("Checkpoint save for '{}' failed: {}", self.card_id, e);
        }
    }

    fn load_guarded(&self) -> Option<PipelineSnapshot> {
        let store = self.store.as_ref()?;
        match store.load(&self.card_id) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Checkpoint load for '{}' failed: {}", self.card_id, e);
                None
            }
        }
    }
}
