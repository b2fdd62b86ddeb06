//! Workflow-visible query surface (§6 / component J's query half).
//!
//! A small shared, lock-guarded snapshot the workflow engine updates as
//! it moves through gates, exposed to external observers through the
//! durable runtime's query mechanism (`QueryHandler` in
//! `tcr-collaborators`) without the workflow itself suspending.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tcr_collaborators::QueryHandler;
use tcr_metrics::{workflow_progress, WorkflowProgress, WorkflowStateSnapshot};
use tcr_state_machine::MachineState;

#[derive(Debug, Clone, Default)]
struct Inner {
    state: String,
    total_gates: u32,
    completed_gates: u32,
    successful_gates: u32,
}

/// Updated by the workflow engine after every gate result; read by the
/// `WorkflowState`/`WorkflowProgress` query handlers below. Cheap to
/// clone (an `Arc` around this is what callers share).
#[derive(Default)]
pub struct WorkflowQueryState {
    inner: Mutex<Inner>,
}

impl WorkflowQueryState {
    pub fn new(total_gates: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: "bootstrap".to_string(),
                total_gates,
                completed_gates: 0,
                successful_gates: 0,
            }),
        }
    }

    pub fn set_state(&self, state: MachineState) {
        self.inner.lock().state = match state {
            MachineState::Gate(gate) => gate.to_string(),
            MachineState::Complete => "complete".to_string(),
            MachineState::Failed => "failed".to_string(),
        };
    }

    pub fn record_gate_outcome(&self, passed: bool) {
        let mut inner = self.inner.lock();
        inner.completed_gates += 1;
        if passed {
            inner.successful_gates += 1;
        }
    }
}

/// `WorkflowState` query: current gate/terminal state plus a timestamp.
pub struct StateQuery;

#[async_trait]
impl QueryHandler<StateQuery, WorkflowStateSnapshot> for WorkflowQueryState {
    async fn handle(&self, _query: StateQuery) -> WorkflowStateSnapshot {
        let state = self.inner.lock().state.clone();
        WorkflowStateSnapshot::new(state, Utc::now())
    }
}

/// `WorkflowProgress` query: completed/total/successful counts and a
/// percentage.
pub struct ProgressQuery;

#[async_trait]
impl QueryHandler<ProgressQuery, WorkflowProgress> for WorkflowQueryState {
    async fn handle(&self, _query: ProgressQuery) -> WorkflowProgress {
        let inner = self.inner.lock();
        workflow_progress(inner.total_gates, inner.completed_gates, inner.successful_gates)
    }
}
