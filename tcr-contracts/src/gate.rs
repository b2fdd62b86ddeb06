use crate::lint::LintResult;
use crate::review::ReviewVote;
use crate::test_result::TestResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed sequence of quality gates the orchestrator drives a task
/// through (§3.1 / §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateName {
    Bootstrap,
    GenTest,
    LintTest,
    VerifyRed,
    GenImpl,
    VerifyGreen,
    MultiReview,
    Commit,
}

impl GateName {
    pub const ALL: [GateName; 8] = [
        GateName::Bootstrap,
        GateName::GenTest,
        GateName::LintTest,
        GateName::VerifyRed,
        GateName::GenImpl,
        GateName::VerifyGreen,
        GateName::MultiReview,
        GateName::Commit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GateName::Bootstrap => "bootstrap",
            GateName::GenTest => "gen_test",
            GateName::LintTest => "lint_test",
            GateName::VerifyRed => "verify_red",
            GateName::GenImpl => "gen_impl",
            GateName::VerifyGreen => "verify_green",
            GateName::MultiReview => "multi_review",
            GateName::Commit => "commit",
        }
    }

    /// Gates that participate in the two-tier retry policy (§4.4).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GateName::GenImpl | GateName::VerifyGreen | GateName::MultiReview
        )
    }
}

impl fmt::Display for GateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One agent invocation recorded by a gate activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub model: String,
    pub prompt: String,
    pub response: String,
    pub files_changed: Vec<String>,
    pub duration_ms: u64,
}

/// Embedded structured output a `GateResult` may carry, depending on
/// which gate produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GateOutcome {
    Test(TestResult),
    Lint(LintResult),
    Reviews(Vec<ReviewVote>),
    None,
}

/// Structured result every gate activity produces (§3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResult {
    pub gate: GateName,
    pub passed: bool,
    pub outcome: GateOutcome,
    pub agent_results: Vec<AgentResult>,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub advisory: Option<String>,
}

impl GateResult {
    pub fn new(gate: GateName, passed: bool) -> Self {
        Self {
            gate,
            passed,
            outcome: GateOutcome::None,
            agent_results: Vec::new(),
            duration_ms: 0,
            error: None,
            advisory: None,
        }
    }

    pub fn with_outcome(mut self, outcome: GateOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_advisory(mut self, advisory: impl Into<String>) -> Self {
        self.advisory = Some(advisory.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_agent_results(mut self, agent_results: Vec<AgentResult>) -> Self {
        self.agent_results = agent_results;
        self
    }

    pub fn test_result(&self) -> Option<&TestResult> {
        match &self.outcome {
            GateOutcome::Test(result) => Some(result),
            _ => None,
        }
    }

    pub fn lint_result(&self) -> Option<&LintResult> {
        match &self.outcome {
            GateOutcome::Lint(result) => Some(result),
            _ => None,
        }
    }

    pub fn reviews(&self) -> Option<&[ReviewVote]> {
        match &self.outcome {
            GateOutcome::Reviews(votes) => Some(votes),
            _ => None,
        }
    }
}
