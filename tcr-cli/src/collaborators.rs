//! Thin, process-backed collaborator implementations for standalone
//! runs of the CLI.
//!
//! None of this is part of the orchestration core: the agent runtime,
//! version control, shell test/lint execution, and cell provisioning
//! are all explicitly out of scope collaborators (§1/§6a). These
//! structs exist only so `tcr` is runnable against a real worktree
//! without a separate durable-runtime deployment; a production
//! deployment plugs in its own `AgentClient`/`CellManager`/etc.
//! against whatever actually provisions cells and serves the agent.

use async_trait::async_trait;
use std::process::Stdio;
use tcr_collaborators::{
    AgentClient, AgentResponse, CellManager, CommandKind, CommandOutput, FileStatus, LintRunOutput, Linter,
    PromptOptions, TestRunOutput, TestRunner, VersionControl,
};
use tcr_contracts::Bootstrap;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

async fn run_piped(argv: &[String], dir: &str, stdin_payload: Option<&str>) -> anyhow::Result<(i32, String, String)> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("empty command"))?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if stdin_payload.is_some() {
        cmd.stdin(Stdio::piped());
    }

    let mut child = cmd.spawn()?;
    if let Some(payload) = stdin_payload {
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(payload.as_bytes()).await?;
        }
    }
    let output = child.wait_with_output().await?;
    Ok((
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    ))
}

/// Shells out to a configured agent binary: the prompt goes in over
/// stdin, the agent's stdout is taken as its response text verbatim.
pub struct ProcessAgentClient {
    command: Vec<String>,
}

impl ProcessAgentClient {
    pub fn new(command: impl Into<String>) -> Self {
        let command = command.into();
        Self {
            command: command.split_whitespace().map(str::to_string).collect(),
        }
    }
}

#[async_trait]
impl AgentClient for ProcessAgentClient {
    async fn execute_prompt(&self, prompt: &str, options: &PromptOptions) -> anyhow::Result<AgentResponse> {
        let (code, stdout, stderr) = run_piped(&self.command, ".", Some(prompt)).await?;
        if code != 0 {
            anyhow::bail!("agent command exited {code} for '{}': {stderr}", options.title);
        }
        Ok(AgentResponse {
            text: stdout,
            tool_results: Vec::new(),
            session_id: options.agent.clone(),
            message_id: options.title.clone(),
        })
    }

    async fn execute_command(&self, dir: &str, kind: CommandKind, argv: &[String]) -> anyhow::Result<CommandOutput> {
        if argv.is_empty() {
            anyhow::bail!("execute_command called with an empty argv ({kind:?})");
        }
        let (code, stdout, stderr) = run_piped(argv, dir, None).await?;
        if code != 0 {
            anyhow::bail!("command {argv:?} exited {code}: {stderr}");
        }
        Ok(CommandOutput { text: stdout })
    }
}

/// Runs a configured test command (e.g. `go test -v`) with the gate's
/// pattern appended as the final argument.
pub struct ShellTestRunner {
    command: Vec<String>,
}

impl ShellTestRunner {
    pub fn new(command: impl Into<String>) -> Self {
        let command = command.into();
        Self {
            command: command.split_whitespace().map(str::to_string).collect(),
        }
    }
}

#[async_trait]
impl TestRunner for ShellTestRunner {
    async fn run(&self, dir: &str, pattern: &str) -> anyhow::Result<TestRunOutput> {
        let mut argv = self.command.clone();
        argv.push(pattern.to_string());
        let (exit_code, stdout, stderr) = run_piped(&argv, dir, None).await?;
        Ok(TestRunOutput { exit_code, stdout, stderr })
    }
}

/// Runs a configured lint command with no arguments beyond the
/// working directory.
pub struct ShellLinter {
    command: Vec<String>,
}

impl ShellLinter {
    pub fn new(command: impl Into<String>) -> Self {
        let command = command.into();
        Self {
            command: command.split_whitespace().map(str::to_string).collect(),
        }
    }
}

#[async_trait]
impl Linter for ShellLinter {
    async fn run(&self, dir: &str) -> anyhow::Result<LintRunOutput> {
        let (exit_code, stdout, stderr) = run_piped(&self.command, dir, None).await?;
        Ok(LintRunOutput { exit_code, stdout, stderr })
    }
}

/// Plain `git` version control against the cell's worktree.
pub struct GitVersionControl;

#[async_trait]
impl VersionControl for GitVersionControl {
    async fn commit(&self, bootstrap: &Bootstrap, message: &str) -> anyhow::Result<()> {
        let (code, _, stderr) = run_piped(
            &["git".to_string(), "add".to_string(), "-A".to_string()],
            &bootstrap.worktree_path,
            None,
        )
        .await?;
        if code != 0 {
            anyhow::bail!("git add failed: {stderr}");
        }
        let (code, _, stderr) = run_piped(
            &["git".to_string(), "commit".to_string(), "-m".to_string(), message.to_string()],
            &bootstrap.worktree_path,
            None,
        )
        .await?;
        if code != 0 {
            anyhow::bail!("git commit failed: {stderr}");
        }
        Ok(())
    }

    async fn revert(&self, bootstrap: &Bootstrap) -> anyhow::Result<()> {
        let (code, _, stderr) = run_piped(
            &["git".to_string(), "reset".to_string(), "--hard".to_string()],
            &bootstrap.worktree_path,
            None,
        )
        .await?;
        if code != 0 {
            anyhow::bail!("git reset --hard failed: {stderr}");
        }
        let (code, _, stderr) = run_piped(
            &["git".to_string(), "clean".to_string(), "-fd".to_string()],
            &bootstrap.worktree_path,
            None,
        )
        .await?;
        if code != 0 {
            anyhow::bail!("git clean -fd failed: {stderr}");
        }
        Ok(())
    }

    async fn get_file_status(&self, bootstrap: &Bootstrap) -> anyhow::Result<Vec<FileStatus>> {
        let (code, stdout, stderr) = run_piped(
            &["git".to_string(), "status".to_string(), "--porcelain".to_string()],
            &bootstrap.worktree_path,
            None,
        )
        .await?;
        if code != 0 {
            anyhow::bail!("git status failed: {stderr}");
        }
        Ok(stdout
            .lines()
            .filter_map(|line| line.get(3..))
            .map(|path| FileStatus { path: path.to_string() })
            .collect())
    }
}

/// Treats `cell_id` as an already-provisioned worktree path: no port
/// allocation, no per-task server. Matches the out-of-scope cell
/// manager boundary (§1) — a real deployment replaces this with
/// whatever actually allocates ports and starts an agent server.
pub struct LocalCellManager;

#[async_trait]
impl CellManager for LocalCellManager {
    async fn bootstrap(&self, cell_id: &str, branch: &str) -> anyhow::Result<Bootstrap> {
        let metadata = tokio::fs::metadata(cell_id).await;
        if metadata.is_err() {
            anyhow::bail!("cell worktree path does not exist: {cell_id}");
        }
        Ok(Bootstrap {
            cell_id: cell_id.to_string(),
            port: 0,
            worktree_id: format!("{cell_id}:{branch}"),
            worktree_path: cell_id.to_string(),
            base_url: "http://localhost".to_string(),
            server_pid: std::process::id(),
        })
    }

    async fn teardown(&self, bootstrap: &Bootstrap) -> anyhow::Result<()> {
        tracing::debug!(cell_id = %bootstrap.cell_id, "local cell manager has nothing to tear down");
        Ok(())
    }
}
