//! Lint-output parser (component A).

use once_cell::sync::Lazy;
use regex::Regex;
use tcr_contracts::{LintIssue, LintResult, LintSeverity};

static LINT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\S+):(\d+):(\d+):\s*(.+?)\s*\((\S+)\)\s*$").unwrap());

/// Parse linter output into a structured `LintResult`.
///
/// Empty input passes. Every matching `<file>:<line>:<col>: <message>
/// (<rule>)` line becomes an error-severity `LintIssue`; lines that
/// don't match the pattern are ignored rather than treated as failures,
/// since a linter's banner/summary lines carry no actionable location.
pub fn parse_lint_output(raw: &str) -> LintResult {
    if raw.trim().is_empty() {
        return LintResult::default();
    }

    let mut issues = Vec::new();
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(caps) = LINT_LINE.captures(trimmed) {
            let file = caps.get(1).unwrap().as_str().to_string();
            let line_no: u32 = caps.get(2).unwrap().as_str().parse().unwrap_or(0);
            let column: u32 = caps.get(3).unwrap().as_str().parse().unwrap_or(0);
            let message = caps.get(4).unwrap().as_str().to_string();
            let rule_id = caps.get(5).unwrap().as_str().to_string();
            issues.push(LintIssue {
                file,
                line: line_no,
                column,
                severity: LintSeverity::Error,
                message,
                rule_id,
            });
        }
    }

    LintResult { issues }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_passes() {
        let result = parse_lint_output("");
        assert!(result.passed());
        assert!(result.issues.is_empty());
    }

    #[test]
    fn single_issue_parsed() {
        let result = parse_lint_output("main.go:10:5: unused variable x (unused)");
        assert!(!result.passed());
        assert_eq!(result.issues.len(), 1);
        let issue = &result.issues[0];
        assert_eq!(issue.file, "main.go");
        assert_eq!(issue.line, 10);
        assert_eq!(issue.column, 5);
        assert_eq!(issue.message, "unused variable x");
        assert_eq!(issue.rule_id, "unused");
    }

    #[test]
    fn summary_grouped_by_file() {
        let raw = "a.go:1:1: one (r1)\na.go:2:1: two (r2)\nb.go:1:1: three (r3)\n";
        let result = parse_lint_output(raw);
        let summary = result.summary();
        assert!(summary.contains("a.go: 2 issue(s)"));
        assert!(summary.contains("b.go: 1 issue(s)"));
    }

    #[test]
    fn non_matching_lines_are_ignored() {
        let raw = "Running linter...\nmain.go:1:1: bad (rule)\nDone.\n";
        let result = parse_lint_output(raw);
        assert_eq!(result.issues.len(), 1);
    }
}
