use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tcr_contracts::Bootstrap;

/// Status of one file in the cell's working tree, as reported by the
/// version-control collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStatus {
    pub path: String,
}

/// Provisions and tears down the isolated working environment ("cell")
/// a task executes in. Implementations typically wrap a container, a
/// worktree, or a sandboxed checkout.
#[async_trait]
pub trait CellManager: Send + Sync {
    async fn bootstrap(&self, cell_id: &str, branch: &str) -> anyhow::Result<Bootstrap>;

    /// Idempotent: tearing down an already-torn-down cell is a no-op,
    /// not an error, since the saga may call it more than once on
    /// overlapping exit paths.
    async fn teardown(&self, bootstrap: &Bootstrap) -> anyhow::Result<()>;
}
