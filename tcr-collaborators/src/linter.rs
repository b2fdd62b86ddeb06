use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct LintRunOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// External lint invocation. Like `TestRunner`, returns raw text; the
/// lint-output parser turns it into `LintIssue`s.
#[async_trait]
pub trait Linter: Send + Sync {
    async fn run(&self, dir: &str) -> anyhow::Result<LintRunOutput>;
}
