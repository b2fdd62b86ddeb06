//! Layered workflow configuration (§2a expansion).
//!
//! Mirrors `agent-agency-contracts`/`orchestration`'s pattern of a
//! plain `serde`-deserializable struct with a literal `Default`, loaded
//! through the `config` crate from a TOML file layered under
//! `TCR_`-prefixed environment overrides, rather than parsed by hand.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tcr_contracts::EnhancedTcrInput;

/// Tunables for one workflow run. Every field has a literal default
/// matching §6's `EnhancedTCRInput` defaults; callers typically start
/// from `WorkflowConfig::default()` and override the handful of fields
/// a given deployment cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub max_retries: u32,
    pub max_fix_attempts: u32,
    pub reviewers_count: u32,
    pub test_pattern: String,
    pub lock_ttl_secs: u64,
    /// Number of concurrent fix strategies the parallel variant fans
    /// out at a targeted-fix point (§4.7).
    pub parallel_fix_attempts: u32,
    pub activity_heartbeat_secs: u64,
    pub commit_message_template: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_retries: EnhancedTcrInput::DEFAULT_MAX_RETRIES,
            max_fix_attempts: EnhancedTcrInput::DEFAULT_MAX_FIX_ATTEMPTS,
            reviewers_count: EnhancedTcrInput::DEFAULT_REVIEWERS_COUNT,
            test_pattern: "./...".to_string(),
            lock_ttl_secs: 900,
            parallel_fix_attempts: 3,
            activity_heartbeat_secs: 30,
            commit_message_template: "enhanced-tcr: {task_id}".to_string(),
        }
    }
}

impl WorkflowConfig {
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.activity_heartbeat_secs)
    }

    pub fn commit_message(&self, task_id: &str) -> String {
        self.commit_message_template.replace("{task_id}", task_id)
    }

    /// Layer a TOML config file (if present) under `TCR_`-prefixed
    /// environment variables (`TCR_MAX_RETRIES=3`, etc.), falling back
    /// to `WorkflowConfig::default()` for anything neither sets.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("TCR").separator("_"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Apply the per-run overrides an `EnhancedTcrInput` carries (§6),
    /// leaving every other field at its configured default.
    pub fn with_input_overrides(mut self, input: &EnhancedTcrInput) -> Self {
        self.max_retries = input.max_retries();
        self.max_fix_attempts = input.max_fix_attempts();
        self.reviewers_count = input.reviewers_count();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_literal_defaults() {
        let config = WorkflowConfig::default();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.max_fix_attempts, 5);
        assert_eq!(config.reviewers_count, 2);
    }

    #[test]
    fn input_overrides_only_touch_retry_fields() {
        let input = EnhancedTcrInput {
            cell_id: "c1".to_string(),
            branch: "main".to_string(),
            task_id: "T1".to_string(),
            description: "desc".to_string(),
            acceptance_criteria: "criteria".to_string(),
            max_retries: Some(9),
            max_fix_attempts: None,
            reviewers_count: Some(4),
        };
        let config = WorkflowConfig::default().with_input_overrides(&input);
        assert_eq!(config.max_retries, 9);
        assert_eq!(config.max_fix_attempts, 5);
        assert_eq!(config.reviewers_count, 4);
        assert_eq!(config.test_pattern, "./...");
    }

    #[test]
    fn commit_message_interpolates_task_id() {
        let config = WorkflowConfig::default();
        assert_eq!(config.commit_message("T1"), "enhanced-tcr: T1");
    }
}
