use crate::cell_manager::FileStatus;
use async_trait::async_trait;
use tcr_contracts::Bootstrap;

/// Version-control operations the `commit`/`revert` gates and the
/// empirical-honesty file-status check delegate to.
#[async_trait]
pub trait VersionControl: Send + Sync {
    async fn commit(&self, bootstrap: &Bootstrap, message: &str) -> anyhow::Result<()>;

    async fn revert(&self, bootstrap: &Bootstrap) -> anyhow::Result<()>;

    async fn get_file_status(&self, bootstrap: &Bootstrap) -> anyhow::Result<Vec<FileStatus>>;
}
