use serde::{Deserialize, Serialize};

/// A single failing test extracted from runner output by the test-output
/// parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFailure {
    pub name: String,
    pub package: String,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub is_panic: bool,
}

impl TestFailure {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: String::new(),
            message: String::new(),
            file: None,
            line: None,
            is_panic: false,
        }
    }
}

/// Aggregate result of a test run, produced from runner exit code and
/// stdout/stderr by the test-output parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub raw_output: String,
    pub duration_ms: u64,
    pub failed_tests: Vec<TestFailure>,
}

impl TestResult {
    /// True if any failure was parsed, or the failed counter is nonzero.
    pub fn has_failures(&self) -> bool {
        !self.failed_tests.is_empty() || self.failed > 0
    }

    /// Concatenated raw-failure blob suitable for a retry-feedback
    /// prompt.
    pub fn raw_failure_blob(&self) -> String {
        self.failed_tests
            .iter()
            .map(|f| {
                if f.is_panic {
                    format!("--- FAIL: {} (panic)\n{}", f.name, f.message)
                } else {
                    format!("--- FAIL: {}\n{}", f.name, f.message)
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
