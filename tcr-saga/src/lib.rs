//! Saga and cleanup (component F).
//!
//! Registers exactly two compensating actions at workflow entry, after
//! a successful bootstrap, and runs them on every exit path in LIFO
//! order on a disconnected context: teardown undoes the most recently
//! registered step first, then the lock release.

use async_trait::async_trait;
use std::sync::Arc;
use tcr_collaborators::{ActivityContext, CellManager};
use tcr_contracts::Bootstrap;
use tcr_locks::LockRegistry;

#[async_trait]
pub trait Compensation: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self) -> anyhow::Result<()>;
}

/// Releases every file lock held under the task's cell identifier.
pub struct ReleaseLocksCompensation {
    registry: Arc<LockRegistry>,
    holder: String,
}

impl ReleaseLocksCompensation {
    pub fn new(registry: Arc<LockRegistry>, holder: impl Into<String>) -> Self {
        Self {
            registry,
            holder: holder.into(),
        }
    }
}

#[async_trait]
impl Compensation for ReleaseLocksCompensation {
    fn name(&self) -> &str {
        "release_file_locks"
    }

    async fn run(&self) -> anyhow::Result<()> {
        self.registry.release_all_for_holder(&self.holder);
        Ok(())
    }
}

/// Tears down the cell.
pub struct TeardownCellCompensation {
    cell_manager: Arc<dyn CellManager>,
    bootstrap: Bootstrap,
}

impl TeardownCellCompensation {
    pub fn new(cell_manager: Arc<dyn CellManager>, bootstrap: Bootstrap) -> Self {
        Self {
            cell_manager,
            bootstrap,
        }
    }
}

#[async_trait]
impl Compensation for TeardownCellCompensation {
    fn name(&self) -> &str {
        "teardown_cell"
    }

    async fn run(&self) -> anyhow::Result<()> {
        self.cell_manager.teardown(&self.bootstrap).await
    }
}

/// Ordered stack of compensations for one workflow run.
#[derive(Default)]
pub struct CompensationSaga {
    actions: Vec<Arc<dyn Compensation>>,
}

impl CompensationSaga {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, compensation: Arc<dyn Compensation>) {
        self.actions.push(compensation);
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Runs every registered compensation, most recently registered
    /// first, each on its own disconnected context. A failing
    /// compensation is logged and does not stop the rest from running.
    pub async fn run_all(&self, ctx: &dyn ActivityContext) {
        for action in self.actions.iter().rev() {
            let action = Arc::clone(action);
            let name = action.name().to_string();
            ctx.disconnected()
                .run(&name, move || async move { action.run().await })
                .await;
        }
    }
}
