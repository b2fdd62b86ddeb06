//! Test-output parser (component A).
//!
//! A pure, line-oriented scan over text that follows the conventions of
//! a standard Go-style test runner (`go test -v`). No I/O, no shared
//! state; parsing the same input twice always yields the same
//! `TestResult`.

use once_cell::sync::Lazy;
use regex::Regex;
use tcr_contracts::{TestFailure, TestResult};

static FAIL_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^--- FAIL: (\S+)").unwrap());
static PASS_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^--- PASS: (\S+)").unwrap());
static BUILD_FAILED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^# (\S+) \[build failed\]\s*$").unwrap());
static ERROR_LOCATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\S+\.\w+):(\d+):\s*(.*)$").unwrap());
static SUMMARY_FAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^FAIL(\s+\S+)?(\s+[\d.]+s)?\s*$").unwrap());

fn is_dropped_noise(trimmed: &str) -> bool {
    trimmed.starts_with("=== RUN")
        || trimmed.starts_with("=== CONT")
        || trimmed.starts_with("=== PAUSE")
        || trimmed.starts_with("=== NAME")
        || trimmed.starts_with("ok ")
        || trimmed.starts_with("ok\t")
        || trimmed.starts_with("coverage:")
        || trimmed == "PASS"
        || SUMMARY_FAIL.is_match(trimmed)
}

fn is_error_accumulator_line(line: &str, trimmed: &str) -> bool {
    (line.starts_with(' ') || line.starts_with('\t'))
        || trimmed.starts_with("Error:")
        || trimmed.starts_with("expected:")
        || trimmed.starts_with("got:")
}

fn append_message(failure: &mut TestFailure, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    if failure.message.is_empty() {
        failure.message = text.trim().to_string();
    } else {
        failure.message.push('\n');
        failure.message.push_str(text.trim());
    }
}

/// Parse `go test -v` style output into a structured `TestResult`.
pub fn parse_test_output(raw: &str) -> TestResult {
    let mut failures: Vec<TestFailure> = Vec::new();
    let mut current: Option<TestFailure> = None;
    let mut raw_failure_lines: Vec<String> = Vec::new();
    let mut passed_count: u32 = 0;

    for line in raw.lines() {
        let trimmed = line.trim_end();

        if let Some(caps) = FAIL_HEADER.captures(trimmed.trim_start()) {
            let name = caps.get(1).unwrap().as_str().to_string();
            match current.take() {
                Some(mut f) if f.name == "Unknown" => {
                    f.name = name;
                    current = Some(f);
                }
                Some(f) => {
                    failures.push(f);
                    current = Some(TestFailure::new(name));
                }
                None => current = Some(TestFailure::new(name)),
            }
            raw_failure_lines.push(trimmed.to_string());
            continue;
        }

        if PASS_HEADER.is_match(trimmed.trim_start()) {
            if let Some(f) = current.take() {
                failures.push(f);
            }
            passed_count += 1;
            continue;
        }

        if let Some(caps) = BUILD_FAILED.captures(trimmed) {
            let package = caps.get(1).unwrap().as_str().to_string();
            if current.is_none() {
                let mut f = TestFailure::new("BuildFailed");
                f.package = package;
                f.message = trimmed.to_string();
                current = Some(f);
            }
            raw_failure_lines.push(trimmed.to_string());
            continue;
        }

        if trimmed.contains("panic:") {
            match current.as_mut() {
                Some(f) => {
                    f.is_panic = true;
                    append_message(f, trimmed);
                }
                None => {
                    let mut f = TestFailure::new("Unknown");
                    f.is_panic = true;
                    f.message = trimmed.trim().to_string();
                    current = Some(f);
                }
            }
            raw_failure_lines.push(trimmed.to_string());
            continue;
        }

        if is_dropped_noise(trimmed) {
            continue;
        }

        if let Some(caps) = ERROR_LOCATION.captures(trimmed) {
            if let Some(f) = current.as_mut() {
                let file = caps.get(1).unwrap().as_str().to_string();
                let line_no: u32 = caps.get(2).unwrap().as_str().parse().unwrap_or(0);
                let message = caps.get(3).unwrap().as_str();
                f.file.get_or_insert(file);
                f.line.get_or_insert(line_no);
                append_message(f, message);
                raw_failure_lines.push(trimmed.to_string());
                continue;
            }
        }

        if current.is_some() && is_error_accumulator_line(line, trimmed) {
            if let Some(f) = current.as_mut() {
                append_message(f, trimmed);
            }
            raw_failure_lines.push(trimmed.to_string());
        }
    }

    if let Some(f) = current.take() {
        failures.push(f);
    }

    let failed = failures.len() as u32;
    TestResult {
        total: failed + passed_count,
        passed: passed_count,
        failed,
        raw_output: raw.to_string(),
        duration_ms: 0,
        failed_tests: failures,
    }
}
