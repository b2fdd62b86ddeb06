use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Per-call overrides for an agent prompt invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptOptions {
    pub title: String,
    pub agent: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub text: String,
    pub tool_results: Vec<String>,
    pub session_id: String,
    pub message_id: String,
}

/// Kind of shell command a gate asks the agent client to run on its
/// behalf (e.g. running the test suite or the linter inside the cell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    Test,
    Lint,
    Shell,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutput {
    pub text: String,
}

/// The single point of contact with the LLM and the shell inside a
/// cell. Gate activities never call an LLM or spawn a process directly;
/// they go through this trait so tests can substitute a deterministic
/// mock.
#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn execute_prompt(&self, prompt: &str, options: &PromptOptions) -> anyhow::Result<AgentResponse>;

    async fn execute_command(&self, dir: &str, kind: CommandKind, argv: &[String]) -> anyhow::Result<CommandOutput>;
}
