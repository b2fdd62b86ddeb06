//! Shared data contracts for the Enhanced TCR orchestration core.
//!
//! Every other crate in the workspace exchanges data through the types
//! defined here rather than through ad-hoc structs, so gate activities,
//! the state machine, and the workflow agree on one vocabulary.

pub mod dag;
pub mod error;
pub mod gate;
pub mod lint;
pub mod review;
pub mod task;
pub mod test_result;

pub use dag::DagTask;
pub use error::{classify_error, CoreError, CoreResult, ErrorCause, ErrorKind};
pub use gate::{AgentResult, GateName, GateOutcome, GateResult};
pub use lint::{LintIssue, LintResult, LintSeverity};
pub use review::{ReviewType, ReviewVote, Vote};
pub use task::{Bootstrap, EnhancedTcrInput, EnhancedTcrResult, Task};
pub use test_result::{TestFailure, TestResult};
