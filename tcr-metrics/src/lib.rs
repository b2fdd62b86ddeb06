//! Metrics collection and workflow-state queries (component J).
//!
//! One `RwLock`-guarded state struct, mirroring the lock registry's
//! single-mutex discipline: many readers (query handlers), one writer
//! at a time (gate/lock instrumentation).

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tcr_contracts::GateName;

#[derive(Debug, Default)]
struct MetricsState {
    lock_acquire_durations_ms: HashMap<String, Vec<u64>>,
    lock_conflicts: HashMap<String, u64>,
    gate_durations_ms: HashMap<GateName, Vec<u64>>,
    gate_pass_counts: HashMap<GateName, (u64, u64)>,
    workflow_start: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetricsSnapshot {
    pub lock_acquire_durations_ms: HashMap<String, Vec<u64>>,
    pub lock_conflicts: HashMap<String, u64>,
    pub gate_durations_ms: HashMap<String, Vec<u64>>,
    pub gate_success_rate: HashMap<String, f64>,
    pub workflow_start: Option<DateTime<Utc>>,
}

/// Thread-safe metrics collector shared across activities in one process.
#[derive(Default)]
pub struct MetricsCollector {
    inner: RwLock<MetricsState>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_workflow_start(&self) {
        let mut state = self.inner.write();
        if state.workflow_start.is_none() {
            state.workflow_start = Some(Utc::now());
        }
    }

    pub fn record_lock_acquire(&self, pattern: &str, duration_ms: u64) {
        self.inner
            .write()
            .lock_acquire_durations_ms
            .entry(pattern.to_string())
            .or_default()
            .push(duration_ms);
    }

    pub fn record_lock_conflict(&self, pattern: &str) {
        *self
            .inner
            .write()
            .lock_conflicts
            .entry(pattern.to_string())
            .or_insert(0) += 1;
    }

    pub fn record_gate_duration(&self, gate: GateName, duration_ms: u64, passed: bool) {
        let mut state = self.inner.write();
        state.gate_durations_ms.entry(gate).or_default().push(duration_ms);
        let entry = state.gate_pass_counts.entry(gate).or_insert((0, 0));
        entry.1 += 1;
        if passed {
            entry.0 += 1;
        }
    }

    /// Rolling pass rate for `gate` across every recorded invocation so
    /// far, or `None` if the gate has never run.
    pub fn gate_success_rate(&self, gate: GateName) -> Option<f64> {
        let state = self.inner.read();
        state.gate_pass_counts.get(&gate).map(|(passed, total)| {
            if *total == 0 {
                0.0
            } else {
                *passed as f64 / *total as f64
            }
        })
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.inner.read();
        let gate_durations_ms = state
            .gate_durations_ms
            .iter()
            .map(|(gate, durations)| (gate.as_str().to_string(), durations.clone()))
            .collect();
        let gate_success_rate = state
            .gate_pass_counts
            .iter()
            .map(|(gate, (passed, total))| {
                let rate = if *total == 0 { 0.0 } else { *passed as f64 / *total as f64 };
                (gate.as_str().to_string(), rate)
            })
            .collect();

        MetricsSnapshot {
            lock_acquire_durations_ms: state.lock_acquire_durations_ms.clone(),
            lock_conflicts: state.lock_conflicts.clone(),
            gate_durations_ms,
            gate_success_rate,
            workflow_start: state.workflow_start,
        }
    }
}

/// Response shape for the `WorkflowState` query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowStateSnapshot {
    pub state: String,
    pub timestamp: DateTime<Utc>,
}

impl WorkflowStateSnapshot {
    pub fn new(state: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            state: state.into(),
            timestamp,
        }
    }
}

/// Response shape for the `WorkflowProgress` query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowProgress {
    pub total: u32,
    pub completed: u32,
    pub successful: u32,
    pub percent: f64,
}

pub fn workflow_progress(total: u32, completed: u32, successful: u32) -> WorkflowProgress {
    let percent = if total == 0 {
        0.0
    } else {
        (completed as f64 / total as f64) * 100.0
    };
    WorkflowProgress {
        total,
        completed,
        successful,
        percent,
    }
}
