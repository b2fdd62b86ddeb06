use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LintSeverity {
    Error,
    Warning,
}

impl fmt::Display for LintSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintSeverity::Error => write!(f, "error"),
            LintSeverity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintIssue {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub severity: LintSeverity,
    pub message: String,
    pub rule_id: String,
}

/// Parsed output of a lint run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LintResult {
    pub issues: Vec<LintIssue>,
}

impl LintResult {
    pub fn passed(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|issue| issue.severity == LintSeverity::Error)
    }

    /// Human-readable summary grouped by file, e.g.
    /// `"foo.rs: 2 issue(s)\nbar.rs: 1 issue(s)"`.
    pub fn summary(&self) -> String {
        if self.issues.is_empty() {
            return "no lint issues".to_string();
        }
        let mut by_file: BTreeMap<&str, usize> = BTreeMap::new();
        for issue in &self.issues {
            *by_file.entry(issue.file.as_str()).or_insert(0) += 1;
        }
        by_file
            .into_iter()
            .map(|(file, count)| format!("{file}: {count} issue(s)"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
