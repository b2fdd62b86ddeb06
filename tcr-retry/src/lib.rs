//! Retry budget (component C).
//!
//! Holds the two caps the two-tier retry policy checks against —
//! `max_fix_attempts` (targeted-fix cap, per gate, per regeneration
//! cycle) and `max_retries` (full-regeneration cap, one counter for the
//! whole run) — plus the counters themselves. Every operation here is a
//! pure mutation; no I/O.

use std::collections::HashMap;
use tcr_contracts::GateName;

#[derive(Debug, Clone)]
pub struct RetryBudget {
    max_retries: u32,
    max_fix_attempts: u32,
    fix_attempts: HashMap<GateName, u32>,
    regen_count: u32,
}

impl RetryBudget {
    pub fn new(max_retries: u32, max_fix_attempts: u32) -> Self {
        Self {
            max_retries,
            max_fix_attempts,
            fix_attempts: HashMap::new(),
            regen_count: 0,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn max_fix_attempts(&self) -> u32 {
        self.max_fix_attempts
    }

    fn fix_count(&self, gate: GateName) -> u32 {
        *self.fix_attempts.get(&gate).unwrap_or(&0)
    }

    /// Record one targeted-fix attempt at `gate`, returning the new
    /// count.
    pub fn increment_retry(&mut self, gate: GateName) -> u32 {
        let entry = self.fix_attempts.entry(gate).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Targeted-fix attempts remaining for `gate` before the two-tier
    /// policy must fall back to full regeneration.
    pub fn remaining(&self, gate: GateName) -> u32 {
        self.max_fix_attempts.saturating_sub(self.fix_count(gate))
    }

    pub fn is_exhausted(&self, gate: GateName) -> bool {
        self.fix_count(gate) >= self.max_fix_attempts
    }

    /// Reset a single gate's fix-attempt counter. Called at the start
    /// of each regeneration cycle, since regeneration earns the gate a
    /// fresh run of targeted fixes.
    pub fn reset_gate(&mut self, gate: GateName) {
        self.fix_attempts.insert(gate, 0);
    }

    pub fn increment_regen(&mut self) -> u32 {
        self.regen_count += 1;
        self.regen_count
    }

    pub fn regen_count(&self) -> u32 {
        self.regen_count
    }

    pub fn regen_remaining(&self) -> u32 {
        self.max_retries.saturating_sub(self.regen_count)
    }

    pub fn is_regen_exhausted(&self) -> bool {
        self.regen_count >= self.max_retries
    }

    pub fn reset_all(&mut self) {
        self.fix_attempts.clear();
        self.regen_count = 0;
    }
}
