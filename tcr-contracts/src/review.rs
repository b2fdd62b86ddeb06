use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewType {
    Testing,
    Functional,
    Architecture,
}

impl fmt::Display for ReviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReviewType::Testing => "testing",
            ReviewType::Functional => "functional",
            ReviewType::Architecture => "architecture",
        };
        write!(f, "{label}")
    }
}

impl ReviewType {
    /// Cycles `testing -> functional -> architecture -> testing -> ...`
    /// so `multi_review` can assign a review type per reviewer index.
    pub fn for_index(index: usize) -> Self {
        match index % 3 {
            0 => ReviewType::Testing,
            1 => ReviewType::Functional,
            _ => ReviewType::Architecture,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vote {
    Approve,
    RequestChange,
    Reject,
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Vote::Approve => "APPROVE",
            Vote::RequestChange => "REQUEST_CHANGE",
            Vote::Reject => "REJECT",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewVote {
    pub reviewer: String,
    pub review_type: ReviewType,
    pub vote: Vote,
    pub feedback: String,
    pub duration_ms: u64,
}
