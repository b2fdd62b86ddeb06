//! Host CLI for the Enhanced TCR orchestrator.
//!
//! Explicitly out of scope for the orchestration core (§1): a thin
//! entry point that parses arguments, resolves `WorkflowConfig`,
//! wires in process-backed collaborator implementations, and drives
//! one `EnhancedTcrInput` through `TcrWorkflow`. Production
//! deployments replace `collaborators::*` with whatever actually
//! serves the agent and provisions cells; this binary exists to make
//! the core runnable standalone.

mod collaborators;

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tcr_collaborators::TracingActivityContext;
use tcr_contracts::{EnhancedTcrInput, GateName};
use tcr_gates::{DefaultPromptBuilder, GateActivities};
use tcr_locks::LockRegistry;
use tcr_metrics::MetricsCollector;
use tcr_workflow::{TcrWorkflow, WorkflowConfig, WorkflowQueryState};

use collaborators::{GitVersionControl, LocalCellManager, ProcessAgentClient, ShellLinter, ShellTestRunner};

#[derive(Debug, Parser)]
#[command(name = "tcr")]
#[command(about = "Drives the Enhanced TCR gate sequence for one task")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one task through bootstrap, the six quality gates, and commit
    Run(RunArgs),
    /// Print the resolved workflow configuration (defaults layered under file/env) and exit
    ShowConfig {
        #[arg(long)]
        config: Option<String>,
    },
}

#[derive(Debug, clap::Args)]
struct RunArgs {
    /// Task identifier, threaded through gate results and the commit message
    #[arg(long)]
    task_id: String,

    /// Natural-language description of the work
    #[arg(long)]
    description: String,

    /// Acceptance criteria the implementation must satisfy
    #[arg(long)]
    acceptance_criteria: String,

    /// Branch name recorded against the cell
    #[arg(long, default_value = "main")]
    branch: String,

    /// Path to the already-provisioned worktree this run operates on
    #[arg(long)]
    worktree: String,

    /// Run the parallel-review / parallel-fix variant instead of sequential
    #[arg(long)]
    parallel: bool,

    /// Layered TOML config file (see `WorkflowConfig::load`)
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    max_retries: Option<u32>,

    #[arg(long)]
    max_fix_attempts: Option<u32>,

    #[arg(long)]
    reviewers_count: Option<u32>,

    /// Shell command invoked with the prompt on stdin for every agent call
    #[arg(long, env = "TCR_AGENT_COMMAND")]
    agent_command: String,

    /// Shell command the verify_red/verify_green gates append the test pattern to
    #[arg(long, env = "TCR_TEST_COMMAND", default_value = "go test -v")]
    test_command: String,

    /// Shell command the lint_test gate runs
    #[arg(long, env = "TCR_LINT_COMMAND", default_value = "golangci-lint run")]
    lint_command: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::ShowConfig { config } => show_config(config.as_deref()),
    }
}

fn show_config(path: Option<&str>) -> anyhow::Result<()> {
    let config = WorkflowConfig::load(path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let input = EnhancedTcrInput {
        cell_id: args.worktree,
        branch: args.branch,
        task_id: args.task_id,
        description: args.description,
        acceptance_criteria: args.acceptance_criteria,
        max_retries: args.max_retries,
        max_fix_attempts: args.max_fix_attempts,
        reviewers_count: args.reviewers_count,
    };

    let agent = Arc::new(ProcessAgentClient::new(args.agent_command));
    let test_runner = Arc::new(ShellTestRunner::new(args.test_command));
    let linter = Arc::new(ShellLinter::new(args.lint_command));
    let vcs = Arc::new(GitVersionControl);
    let cell_manager = Arc::new(LocalCellManager);
    let prompts = Arc::new(DefaultPromptBuilder);

    let gates = Arc::new(GateActivities::new(agent.clone(), test_runner, linter, vcs, prompts));
    let lock_registry = Arc::new(LockRegistry::new());
    let metrics = Arc::new(MetricsCollector::new());
    let config = WorkflowConfig::load(args.config.as_deref())?;

    let workflow = if args.parallel {
        TcrWorkflow::parallel(gates, agent, cell_manager, lock_registry, metrics, config)
    } else {
        TcrWorkflow::sequential(gates, agent, cell_manager, lock_registry, metrics, config)
    };

    let ctx = TracingActivityContext::new();
    let query_state = WorkflowQueryState::new(GateName::ALL.len() as u32);

    let result = workflow.run(&ctx, &query_state, input).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        anyhow::bail!(result.error.unwrap_or_else(|| "workflow failed".to_string()));
    }
    Ok(())
}
