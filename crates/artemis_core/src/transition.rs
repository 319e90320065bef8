//! State transition engine: validation, history, and counters.
//!
//! The engine owns the current pipeline state and is the only component
//! allowed to mutate it. Invalid transition requests are refused with a
//! `false` return rather than an error: failure handling is the normal
//! control flow of a recovery system, so callers check the boolean instead
//! of catching exceptions.
//!
//! The engine performs no locking. It is designed to be driven from one
//! logical control flow per pipeline instance; hosts that run stages
//! concurrently must serialize their calls to `transition`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::events::{EventSink, PipelineEvent};
use crate::state::{EventType, PipelineState};
use crate::validator::is_valid_transition;

/// A single recorded state transition. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from_state: PipelineState,
    pub to_state: PipelineState,
    pub event: EventType,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Transition counters.
///
/// Invariant: `total_transitions == successful_transitions + rejected_transitions`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionStats {
    pub total_transitions: u64,
    pub successful_transitions: u64,
    pub rejected_transitions: u64,
}

/// Executes and records pipeline state transitions.
pub struct StateTransitionEngine {
    run_id: Uuid,
    card_id: Option<String>,
    current_state: PipelineState,
    history: Vec<StateTransition>,
    stats: TransitionStats,
    sink: Option<Arc<dyn EventSink>>,
}

impl Default for StateTransitionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTransitionEngine {
    /// Create a new engine starting at `Idle`.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            card_id: None,
            current_state: PipelineState::Idle,
            history: Vec::new(),
            stats: TransitionStats::default(),
            sink: None,
        }
    }

    /// Tag transitions and events with the card being processed.
    pub fn with_card_id(mut self, card_id: impl Into<String>) -> Self {
        self.card_id = Some(card_id.into());
        self
    }

    /// Broadcast successful transitions to an event sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Request a transition to `to_state`.
    ///
    /// Returns `true` and records the transition if it is legal; returns
    /// `false` without mutating state otherwise. Rejections are counted and
    /// logged, never raised.
    pub fn transition(&mut self, to_state: PipelineState, event: EventType) -> bool {
        self.transition_with(to_state, event, None, HashMap::new())
    }

    /// As `transition`, with a reason string and metadata attached to the
    /// history record.
    pub fn transition_with(
        &mut self,
        to_state: PipelineState,
        event: EventType,
        reason: Option<&str>,
        metadata: HashMap<String, serde_json::Value>,
    ) -> bool {
        self.stats.total_transitions += 1;

        if !is_valid_transition(self.current_state, to_state) {
            self.stats.rejected_transitions += 1;
            warn!(
                "Rejected transition {} → {} (event: {})",
                self.current_state, to_state, event
            );
            return false;
        }

        let record = StateTransition {
            from_state: self.current_state,
            to_state,
            event,
            timestamp: Utc::now(),
            reason: reason.map(String::from),
            metadata,
        };

        info!(
            "Transition {} → {} (event: {})",
            self.current_state, to_state, event
        );

        self.history.push(record);
        self.current_state = to_state;
        self.stats.successful_transitions += 1;

        if let Some(sink) = &self.sink {
            let mut notification = PipelineEvent::new(event).with_data(serde_json::json!({
                "from": self.history.last().map(|t| t.from_state),
                "to": to_state,
                "run_id": self.run_id,
            }));
            if let Some(card_id) = &self.card_id {
                notification = notification.with_card(card_id.clone());
            }
            sink.notify(&notification);
        }

        true
    }

    /// The unique id of this engine instance.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn current_state(&self) -> PipelineState {
        self.current_state
    }

    /// The append-only transition history, ordered by call sequence.
    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    pub fn stats(&self) -> TransitionStats {
        self.stats
    }

    /// One-line history summary for diagnostics.
    pub fn summary(&self) -> String {
        let path: Vec<&str> = std::iter::once(PipelineState::Idle.as_str())
            .chain(self.history.iter().map(|t| t.to_state.as_str()))
            .collect();
        debug!("State history for run {}: {}", self.run_id, path.join(" → "));
        format!(
            "{} ({} transitions, {} rejected)",
            path.join(" → "),
            self.stats.successful_transitions,
            self.stats.rejected_transitions
        )
    }
}
