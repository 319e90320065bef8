//! Per-stage circuit breakers.
//!
//! A complementary guard above the workflow-retry mechanism: once a stage
//! has failed `failure_threshold` times in a row, its circuit opens and the
//! orchestrator is expected to skip or defer the stage instead of retrying
//! it, which stops retry storms at the stage-invocation layer.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Health record for one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageHealth {
    pub stage_name: String,
    pub consecutive_failures: u32,
    pub total_failures: u64,
    pub total_successes: u64,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub average_duration_seconds: Option<f64>,
    pub circuit_open: bool,
}

impl StageHealth {
    fn new(stage_name: impl Into<String>) -> Self {
        Self {
            stage_name: stage_name.into(),
            consecutive_failures: 0,
            total_failures: 0,
            total_successes: 0,
            last_failure_at: None,
            last_success_at: None,
            average_duration_seconds: None,
            circuit_open: false,
        }
    }
}

/// Tracks failure counts per stage and opens circuits past a threshold.
#[derive(Debug)]
pub struct CircuitBreakerManager {
    failure_threshold: u32,
    stages: HashMap<String, StageHealth>,
}

impl CircuitBreakerManager {
    pub fn new(failure_threshold: u32) -> Self {
        Self {
            failure_threshold,
            stages: HashMap::new(),
        }
    }

    /// Record a stage failure. Returns `true` when this failure opened the
    /// circuit.
    pub fn record_failure(&mut self, stage_name: &str) -> bool {
        let health = self
            .stages
            .entry(stage_name.to_string())
            .or_insert_with(|| StageHealth::new(stage_name));

        health.consecutive_failures += 1;
        health.total_failures += 1;
        health.last_failure_at = Some(Utc::now());

        if !health.circuit_open && health.consecutive_failures >= self.failure_threshold {
            health.circuit_open = true;
            warn!(
                "Circuit opened for stage '{}' after {} consecutive failure(s)",
                stage_name, health.consecutive_failures
            );
            return true;
        }
        false
    }

    /// Record a successful stage run, closing the circuit and resetting the
    /// consecutive-failure count.
    pub fn record_success(&mut self, stage_name: &str, duration_seconds: f64) {
        let health = self
            .stages
            .entry(stage_name.to_string())
            .or_insert_with(|| StageHealth::new(stage_name));

        health.consecutive_failures = 0;
        health.total_successes += 1;
        health.last_success_at = Some(Utc::now());
        health.average_duration_seconds = Some(match health.average_duration_seconds {
            Some(avg) => {
                let n = health.total_successes as f64;
                (avg * (n - 1.0) + duration_seconds) / n
            }
            None => duration_seconds,
        });

        if health.circuit_open {
            info!("Circuit closed for stage '{}'", stage_name);
            health.circuit_open = false;
        }
    }

    /// Whether the stage's circuit is open (`true` = blocked).
    pub fn check_circuit(&self, stage_name: &str) -> bool {
        self.stages
            .get(stage_name)
            .map(|health| health.circuit_open)
            .unwrap_or(false)
    }

    /// Manually close a stage's circuit and zero its counters.
    pub fn reset(&mut self, stage_name: &str) {
        if let Some(health) = self.stages.get_mut(stage_name) {
            debug!("Resetting circuit breaker for stage '{}'", stage_name);
            health.consecutive_failures = 0;
            health.circuit_open = false;
        }
    }

    pub fn health(&self, stage_name: &str) -> Option<&StageHealth> {
        self.stages.get(stage_name)
    }

    /// Names of stages whose circuit is currently open.
    pub fn open_circuits(&self) -> Vec<String> {
        self.stages
            .values()
            .filter(|health| health.circuit_open)
            .map(|health| health.stage_name.clone())
            .collect()
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_opens_at_threshold() {
        let mut breakers = CircuitBreakerManager::new(3);

        assert!(!breakers.record_failure("development"));
        assert!(!breakers.record_failure("development"));
        assert!(!breakers.check_circuit("development"));

        assert!(breakers.record_failure("development"));
        assert!(breakers.check_circuit("development"));
        // Further failures keep the circuit open without re-reporting.
        assert!(!breakers.record_failure("development"));
    }

    #[test]
    fn test_success_resets_consecutive_count() {
        let mut breakers = CircuitBreakerManager::new(3);
        breakers.record_failure("testing");
        breakers.record_failure("testing");
        breakers.record_success("testing", 12.5);

        // The streak starts over.
        assert!(!breakers.record_failure("testing"));
        assert!(!breakers.record_failure("testing"));
        assert!(breakers.record_failure("testing"));

        let health = breakers.health("testing").unwrap();
        assert_eq!(health.total_failures, 5);
        assert_eq!(health.total_successes, 1);
    }

    #[test]
    fn test_success_closes_open_circuit() {
        let mut breakers = CircuitBreakerManager::new(1);
        breakers.record_failure("architecture");
        assert!(breakers.check_circuit("architecture"));

        breakers.record_success("architecture", 3.0);
        assert!(!breakers.check_circuit("architecture"));
    }

    #[test]
    fn test_average_duration_is_running_mean() {
        let mut breakers = CircuitBreakerManager::new(3);
        breakers.record_success("development", 10.0);
        breakers.record_success("development", 20.0);

        let health = breakers.health("development").unwrap();
        assert!((health.average_duration_seconds.unwrap() - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unknown_stage_is_closed() {
        let breakers = CircuitBreakerManager::new(3);
        assert!(!breakers.check_circuit("never-seen"));
        assert!(breakers.open_circuits().is_empty());
    }

    #[test]
    fn test_manual_reset() {
        let mut breakers = CircuitBreakerManager::new(1);
        breakers.record_failure("testing");
        assert_eq!(breakers.open_circuits(), vec!["testing"]);

        breakers.reset("testing");
        assert!(!breakers.check_circuit("testing"));
    }
}
