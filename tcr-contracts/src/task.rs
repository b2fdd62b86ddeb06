use serde::{Deserialize, Serialize};

/// A unit of work handed to the orchestrator by its caller.
///
/// Immutable for the lifetime of a workflow run: nothing inside the core
/// mutates a `Task` after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub description: String,
    pub acceptance_criteria: String,
    pub branch: String,
    pub cell_id: String,
}

impl Task {
    pub fn new(
        task_id: impl Into<String>,
        description: impl Into<String>,
        acceptance_criteria: impl Into<String>,
        branch: impl Into<String>,
        cell_id: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            description: description.into(),
            acceptance_criteria: acceptance_criteria.into(),
            branch: branch.into(),
            cell_id: cell_id.into(),
        }
    }
}

/// Handle returned by the external cell manager at workflow entry.
///
/// Read-only after creation and required as an input to every gate
/// activity; the saga (§4.6) is responsible for tearing it down exactly
/// once on every exit path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bootstrap {
    pub cell_id: String,
    pub port: u16,
    pub worktree_id: String,
    pub worktree_path: String,
    pub base_url: String,
    pub server_pid: u32,
}

/// Inputs accepted at workflow start (`EnhancedTCRInput` in the design
/// doc), with defaults matching §6: `max_retries = 2`, `max_fix_attempts
/// = 5`, `reviewers_count = 2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancedTcrInput {
    pub cell_id: String,
    pub branch: String,
    pub task_id: String,
    pub description: String,
    pub acceptance_criteria: String,
    pub max_retries: Option<u32>,
    pub max_fix_attempts: Option<u32>,
    pub reviewers_count: Option<u32>,
}

impl EnhancedTcrInput {
    pub const DEFAULT_MAX_RETRIES: u32 = 2;
    pub const DEFAULT_MAX_FIX_ATTEMPTS: u32 = 5;
    pub const DEFAULT_REVIEWERS_COUNT: u32 = 2;

    pub fn task(&self) -> Task {
        Task::new(
            self.task_id.clone(),
            self.description.clone(),
            self.acceptance_criteria.clone(),
            self.branch.clone(),
            self.cell_id.clone(),
        )
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(Self::DEFAULT_MAX_RETRIES)
    }

    pub fn max_fix_attempts(&self) -> u32 {
        self.max_fix_attempts.unwrap_or(Self::DEFAULT_MAX_FIX_ATTEMPTS)
    }

    pub fn reviewers_count(&self) -> u32 {
        self.reviewers_count.unwrap_or(Self::DEFAULT_REVIEWERS_COUNT)
    }
}

/// Final outcome of a workflow run (`EnhancedTCRResult` in the design
/// doc).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnhancedTcrResult {
    pub success: bool,
    pub gate_results: Vec<crate::gate::GateResult>,
    pub files_changed: Vec<String>,
    pub error: Option<String>,
}
