//! Gate state machine (component D).
//!
//! Models the gate graph as a tagged-variant state plus an explicit
//! transition function, not as mutually referencing state objects (see
//! the design doc's §9 note on this). Retry counters live in
//! `tcr_retry::RetryBudget`, a sibling field, not inside the state
//! value itself.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tcr_contracts::{CoreError, CoreResult, GateName};
use tcr_retry::RetryBudget;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineState {
    Gate(GateName),
    Complete,
    Failed,
}

impl MachineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MachineState::Complete | MachineState::Failed)
    }
}

/// What the workflow (component G) should do in response to a gate
/// result, decided by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Gate passed; move on to the next gate in the sequence.
    Advance(GateName),
    /// The final gate passed; the workflow should commit and finish.
    Complete,
    /// Stay in the current gate; invoke a targeted fix and retry.
    RetryFix,
    /// Fix attempts for the current gate are exhausted but the
    /// regeneration budget is not: revert the working copy, then
    /// resume from `revert_to`.
    Regenerate { revert_to: GateName },
    /// Both budgets exhausted, or a fatal gate failed: terminal.
    Failed(String),
}

#[derive(Debug, Clone, Copy)]
pub struct RetryInfo {
    pub fix_attempts_remaining: u32,
    pub regen_remaining: u32,
}

#[derive(Debug, Clone, Default)]
pub struct MachineMetrics {
    pub visit_counts: HashMap<GateName, u32>,
    pub total_visits: u32,
}

/// Drives a single task through the fixed gate sequence.
pub struct StateMachine {
    current: MachineState,
    budget: RetryBudget,
    visit_counts: HashMap<GateName, u32>,
    max_retries: u32,
    max_fix_attempts: u32,
}

impl StateMachine {
    pub fn new(max_retries: u32, max_fix_attempts: u32) -> Self {
        Self {
            current: MachineState::Gate(GateName::Bootstrap),
            budget: RetryBudget::new(max_retries, max_fix_attempts),
            visit_counts: HashMap::new(),
            max_retries,
            max_fix_attempts,
        }
    }

    pub fn current_state(&self) -> MachineState {
        self.current
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    /// Gate each gate on pass transitions to, per the static edge set.
    fn forward(gate: GateName) -> MachineState {
        match gate {
            GateName::Bootstrap => MachineState::Gate(GateName::GenTest),
            GateName::GenTest => MachineState::Gate(GateName::LintTest),
            GateName::LintTest => MachineState::Gate(GateName::VerifyRed),
            GateName::VerifyRed => MachineState::Gate(GateName::GenImpl),
            GateName::GenImpl => MachineState::Gate(GateName::VerifyGreen),
            GateName::VerifyGreen => MachineState::Gate(GateName::MultiReview),
            GateName::MultiReview => MachineState::Gate(GateName::Commit),
            GateName::Commit => MachineState::Complete,
        }
    }

    /// Gate each gate on fail transitions to, ignoring budget state.
    /// Used for `can_transition_to` queries and edge-set validation;
    /// the real on-failure behaviour also consults the retry budget
    /// (see `on_gate_result`).
    fn fail_target(gate: GateName) -> MachineState {
        match gate {
            GateName::Bootstrap | GateName::Commit => MachineState::Failed,
            GateName::GenTest => MachineState::Gate(GateName::GenTest),
            GateName::LintTest | GateName::VerifyRed => MachineState::Gate(GateName::GenTest),
            GateName::GenImpl => MachineState::Gate(GateName::GenImpl),
            GateName::VerifyGreen => MachineState::Gate(GateName::VerifyGreen),
            GateName::MultiReview => MachineState::Gate(GateName::MultiReview),
        }
    }

    /// Whether `target` is reachable from the current state via one
    /// edge in the static table (§4.4). Terminal states are absorbing.
    pub fn can_transition_to(&self, target: MachineState) -> bool {
        match self.current {
            MachineState::Complete | MachineState::Failed => target == self.current,
            MachineState::Gate(gate) => {
                target == Self::forward(gate) || target == Self::fail_target(gate)
            }
        }
    }

    /// Apply a gate's pass/fail result. `gate` must equal the current
    /// gate; any other value is a bug in the caller and is refused
    /// (invariant 5).
    pub fn on_gate_result(&mut self, gate: GateName, passed: bool) -> CoreResult<TransitionOutcome> {
        let current_gate = match self.current {
            MachineState::Gate(g) => g,
            _ => {
                return Err(CoreError::IllegalTransition {
                    from: format!("{:?}", self.current),
                    to: gate.to_string(),
                })
            }
        };
        if current_gate != gate {
            return Err(CoreError::IllegalTransition {
                from: current_gate.to_string(),
                to: gate.to_string(),
            });
        }

        *self.visit_counts.entry(gate).or_insert(0) += 1;

        if passed {
            let next = Self::forward(gate);
            info!(%gate, ?next, "gate passed");
            self.current = next;
            return Ok(match next {
                MachineState::Complete => TransitionOutcome::Complete,
                MachineState::Gate(g) => TransitionOutcome::Advance(g),
                MachineState::Failed => {
                    unreachable!("no gate transitions to Failed on pass")
                }
            });
        }

        self.on_gate_failure(gate)
    }

    fn on_gate_failure(&mut self, gate: GateName) -> CoreResult<TransitionOutcome> {
        match gate {
            GateName::Bootstrap | GateName::Commit => {
                warn!(%gate, "fatal gate failed, no retry");
                self.current = MachineState::Failed;
                Ok(TransitionOutcome::Failed(format!(
                    "{gate} failed (fatal: no retry)"
                )))
            }
            GateName::GenTest => {
                if self.budget.is_exhausted(gate) {
                    self.current = MachineState::Failed;
                    Ok(TransitionOutcome::Failed(format!(
                        "{gate} exhausted fix attempts"
                    )))
                } else {
                    self.budget.increment_retry(gate);
                    Ok(TransitionOutcome::RetryFix)
                }
            }
            GateName::LintTest | GateName::VerifyRed => {
                if self.budget.is_regen_exhausted() {
                    self.current = MachineState::Failed;
                    Ok(TransitionOutcome::Failed(format!(
                        "{gate} failed and regeneration budget exhausted"
                    )))
                } else {
                    self.budget.increment_regen();
                    self.budget.reset_gate(GateName::GenTest);
                    self.current = MachineState::Gate(GateName::GenTest);
                    Ok(TransitionOutcome::Regenerate {
                        revert_to: GateName::GenTest,
                    })
                }
            }
            GateName::GenImpl | GateName::VerifyGreen | GateName::MultiReview => {
                if !self.budget.is_exhausted(gate) {
                    self.budget.increment_retry(gate);
                    Ok(TransitionOutcome::RetryFix)
                } else if !self.budget.is_regen_exhausted() {
                    self.budget.increment_regen();
                    self.budget.reset_gate(gate);
                    self.current = MachineState::Gate(GateName::GenImpl);
                    Ok(TransitionOutcome::Regenerate {
                        revert_to: GateName::GenImpl,
                    })
                } else {
                    self.current = MachineState::Failed;
                    Ok(TransitionOutcome::Failed(format!(
                        "{gate} failed: fix and regeneration budgets exhausted"
                    )))
                }
            }
        }
    }

    pub fn get_retry_info(&self) -> Option<RetryInfo> {
        match self.current {
            MachineState::Gate(gate) => Some(RetryInfo {
                fix_attempts_remaining: self.budget.remaining(gate),
                regen_remaining: self.budget.regen_remaining(),
            }),
            _ => None,
        }
    }

    pub fn get_metrics(&self) -> MachineMetrics {
        MachineMetrics {
            visit_counts: self.visit_counts.clone(),
            total_visits: self.visit_counts.values().sum(),
        }
    }

    /// Reset to the initial state with a fresh budget. Test-only: a
    /// real workflow run never reuses a `StateMachine`.
    pub fn reset(&mut self) {
        self.current = MachineState::Gate(GateName::Bootstrap);
        self.budget = RetryBudget::new(self.max_retries, self.max_fix_attempts);
        self.visit_counts.clear();
    }
}
