//! Collaborator boundaries (§6 / §6a): narrow `async_trait` interfaces
//! for every upstream system the orchestration core consumes, used
//! only as trait objects (`Arc<dyn CellManager>`, etc.) so the core
//! never depends on a concrete worker, VCS, or durable-runtime
//! implementation.

pub mod agent_client;
pub mod cell_manager;
pub mod linter;
pub mod runtime;
pub mod test_runner;
pub mod vcs;

pub use agent_client::{AgentClient, AgentResponse, CommandKind, CommandOutput, PromptOptions};
pub use cell_manager::{CellManager, FileStatus};
pub use linter::{LintRunOutput, Linter};
pub use runtime::{ActivityContext, DisconnectedContext, QueryHandler, Signal, SignalSender, TracingActivityContext};
pub use test_runner::{TestRunOutput, TestRunner};
pub use vcs::VersionControl;
