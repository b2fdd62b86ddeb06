use std::fmt;

/// Broad classification of a failure surfaced by the orchestration core.
///
/// Mirrors the propagation policy in the design doc: transient errors are
/// retried beneath the durable runtime and never reach this enum; gate
/// failures are values (`GateResult::passed = false`), not errors. What's
/// left are the kinds the workflow itself must report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    LockConflict,
    BudgetExhausted,
    Fatal,
    InvalidInput,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::LockConflict => "lock-conflict",
            ErrorKind::BudgetExhausted => "budget-exhausted",
            ErrorKind::Fatal => "fatal",
            ErrorKind::InvalidInput => "invalid-input",
        };
        write!(f, "{label}")
    }
}

/// Errors shared across the orchestration core's crates.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("lock conflict on pattern {pattern}: held by {holders:?}")]
    LockConflict {
        pattern: String,
        holders: Vec<String>,
    },

    #[error("holder mismatch releasing {pattern}: expected {expected}, got {actual}")]
    LockHolderMismatch {
        pattern: String,
        expected: String,
        actual: String,
    },

    #[error("retry budget exhausted for gate {gate}: {detail}")]
    BudgetExhausted { gate: String, detail: String },

    #[error("fatal error in gate {gate}: {message}")]
    Fatal { gate: String, message: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("illegal state transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("enforcement breach: {0}")]
    Enforcement(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::LockConflict { .. } | CoreError::LockHolderMismatch { .. } => {
                ErrorKind::LockConflict
            }
            CoreError::BudgetExhausted { .. } => ErrorKind::BudgetExhausted,
            CoreError::Fatal { .. }
            | CoreError::IllegalTransition { .. }
            | CoreError::Enforcement(_) => ErrorKind::Fatal,
            CoreError::InvalidInput(_) | CoreError::Serialization(_) => ErrorKind::InvalidInput,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Cause bucket produced by the error classifier (§7 of the design doc).
///
/// Classification is substring-based and case-sensitive; order matters:
/// timeout patterns are checked first, then network, then input, then
/// agent-specific markers, with `Unknown` as the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCause {
    Timeout,
    Network,
    InvalidInput,
    AgentError,
    Unknown,
}

impl fmt::Display for ErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorCause::Timeout => "timeout",
            ErrorCause::Network => "network",
            ErrorCause::InvalidInput => "invalid_input",
            ErrorCause::AgentError => "agent_error",
            ErrorCause::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}

const TIMEOUT_MARKERS: &[&str] = &["timeout", "timed out", "deadline exceeded"];
const NETWORK_MARKERS: &[&str] = &[
    "connection refused",
    "connection reset",
    "EOF",
    "service unavailable",
    "network",
];
const INPUT_MARKERS: &[&str] = &["invalid input", "invalid argument", "malformed", "required field"];
const AGENT_MARKERS: &[&str] = &["agent error", "prompt rejected", "model refused", "tool call failed"];

/// Classify a raw error message into a cause bucket.
///
/// Order matters: the first matching bucket wins, so a message containing
/// both a timeout and a network marker classifies as `Timeout`.
pub fn classify_error(message: &str) -> ErrorCause {
    if TIMEOUT_MARKERS.iter().any(|m| message.contains(m)) {
        return ErrorCause::Timeout;
    }
    if NETWORK_MARKERS.iter().any(|m| message.contains(m)) {
        return ErrorCause::Network;
    }
    if INPUT_MARKERS.iter().any(|m| message.contains(m)) {
        return ErrorCause::InvalidInput;
    }
    if AGENT_MARKERS.iter().any(|m| message.contains(m)) {
        return ErrorCause::AgentError;
    }
    ErrorCause::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_wins_over_network() {
        let msg = "request timed out: connection reset by peer";
        assert_eq!(classify_error(msg), ErrorCause::Timeout);
    }

    #[test]
    fn network_marker_detected() {
        assert_eq!(classify_error("connection refused by host"), ErrorCause::Network);
    }

    #[test]
    fn unknown_when_no_marker_matches() {
        assert_eq!(classify_error("something unexpected happened"), ErrorCause::Unknown);
    }

    #[test]
    fn case_sensitive_markers() {
        // "EOF" is a marker but "eof" is not - classification is case-sensitive.
        assert_eq!(classify_error("eof while reading"), ErrorCause::Unknown);
        assert_eq!(classify_error("unexpected EOF"), ErrorCause::Network);
    }
}
