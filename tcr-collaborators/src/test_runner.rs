use async_trait::async_trait;

/// Raw output of one test-runner invocation, before it is handed to
/// the test-output parser. The trait never parses its own output —
/// free-form text never feeds a control-flow decision directly.
#[derive(Debug, Clone)]
pub struct TestRunOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// External `go test -v <pattern>` (or equivalent) invocation.
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run(&self, dir: &str, pattern: &str) -> anyhow::Result<TestRunOutput>;
}
