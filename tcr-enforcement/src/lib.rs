//! Gate enforcement guardrails (component K).
//!
//! Two independent checks layered around `gen_impl`/`fix_from_feedback`
//! and `verify_green`: test-file immutability (enforced through the
//! lock registry) and an empirical-honesty check on what the agent
//! claims versus what the test runner actually reported.

use std::time::Duration;
use tcr_contracts::{CoreError, CoreResult, TestResult};
use tcr_locks::{AcquireRequest, LockRegistry};
use tracing::{info, warn};

/// Locks every test file in `test_files` under `holder` before an
/// implementation or fix activity runs. An empty set is refused: a
/// task with no test files to protect means the immutability gate was
/// never set up, which is a configuration bug, not a pass-through.
pub fn lock_test_files(
    registry: &LockRegistry,
    test_files: &[String],
    holder: &str,
    ttl: Duration,
) -> CoreResult<()> {
    if test_files.is_empty() {
        return Err(CoreError::Enforcement(
            "test-file immutability gate invoked with an empty test-file set".to_string(),
        ));
    }

    let requests = test_files
        .iter()
        .map(|path| AcquireRequest::exclusive(path.clone(), holder.to_string(), ttl))
        .collect();

    registry.batch_acquire(requests).map_err(|err| {
        warn!(pattern = %err.pattern, conflicts = err.conflicts.len(), "test-file lock conflict");
        CoreError::LockConflict {
            pattern: err.pattern,
            holders: err.conflicts.into_iter().map(|entry| entry.holder).collect(),
        }
    })?;

    info!(holder, count = test_files.len(), "test files locked");
    Ok(())
}

/// Always unlocks every test file held by `holder`, regardless of exit
/// path. Sibling to the saga's compensations but run independently of
/// them, since enforcement can run mid-gate without a full workflow
/// failure.
pub fn unlock_test_files(registry: &LockRegistry, holder: &str) -> usize {
    registry.release_all_for_holder(holder)
}

/// What the agent's own narration claims about the test outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    Success,
    Failure,
    Unclear,
}

const SUCCESS_MARKERS: &[&str] = &["all tests pass", "all tests passed", "tests are passing", "green"];
const FAILURE_MARKERS: &[&str] = &["test failed", "tests failed", "failing", "red"];

/// Infer the agent's claim from its free-form response text. Ordered:
/// failure markers are checked first, so a response hedging "tests
/// were red but now pass" is read conservatively as still claiming
/// failure unless it also contains no failure marker.
pub fn classify_claim(text: &str) -> Claim {
    let lowered = text.to_lowercase();
    if FAILURE_MARKERS.iter().any(|m| lowered.contains(m)) {
        return Claim::Failure;
    }
    if SUCCESS_MARKERS.iter().any(|m| lowered.contains(m)) {
        return Claim::Success;
    }
    Claim::Unclear
}

/// Compares the agent's claim against what the test runner actually
/// reported. Mismatch is a hard error that fails the gate outright,
/// not a retryable condition.
pub fn check_empirical_honesty(claim_text: &str, actual: &TestResult) -> CoreResult<()> {
    let claim = classify_claim(claim_text);
    let actually_passed = !actual.has_failures();

    let mismatch = matches!(
        (claim, actually_passed),
        (Claim::Success, false) | (Claim::Failure, true)
    );

    if mismatch {
        return Err(CoreError::Enforcement(format!(
            "empirical honesty check failed: agent claimed {claim:?} but test runner reported {}",
            if actually_passed { "pass" } else { "failures" }
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcr_contracts::TestFailure;

    fn ttl() -> Duration {
        Duration::from_secs(300)
    }

    #[test]
    fn empty_test_file_set_is_a_hard_error() {
        let registry = LockRegistry::new();
        let err = lock_test_files(&registry, &[], "holder1", ttl()).unwrap_err();
        assert!(matches!(err, CoreError::Enforcement(_)));
    }

    #[test]
    fn locks_every_file_and_unlock_releases_all() {
        let registry = LockRegistry::new();
        let files = vec!["a_test.go".to_string(), "b_test.go".to_string()];
        lock_test_files(&registry, &files, "holder1", ttl()).unwrap();
        assert_eq!(registry.len(), 2);
        let released = unlock_test_files(&registry, "holder1");
        assert_eq!(released, 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn conflicting_lock_surfaces_as_lock_conflict() {
        let registry = LockRegistry::new();
        registry.acquire(AcquireRequest::exclusive("a_test.go", "other", ttl()));
        let err = lock_test_files(&registry, &["a_test.go".to_string()], "holder1", ttl()).unwrap_err();
        assert!(matches!(err, CoreError::LockConflict { .. }));
    }

    fn passing_result() -> TestResult {
        TestResult {
            total: 3,
            passed: 3,
            failed: 0,
            raw_output: "PASS".to_string(),
            duration_ms: 10,
            failed_tests: Vec::new(),
        }
    }

    fn failing_result() -> TestResult {
        let mut failure = TestFailure::new("TestFoo");
        failure.message = "assertion failed".to_string();
        TestResult {
            total: 3,
            passed: 2,
            failed: 1,
            raw_output: "FAIL".to_string(),
            duration_ms: 10,
            failed_tests: vec![failure],
        }
    }

    #[test]
    fn honest_success_claim_passes() {
        assert!(check_empirical_honesty("all tests pass", &passing_result()).is_ok());
    }

    #[test]
    fn honest_failure_claim_passes() {
        assert!(check_empirical_honesty("tests failed on edge case", &failing_result()).is_ok());
    }

    #[test]
    fn false_success_claim_is_rejected() {
        let err = check_empirical_honesty("all tests pass", &failing_result()).unwrap_err();
        assert!(matches!(err, CoreError::Enforcement(_)));
    }

    #[test]
    fn false_failure_claim_is_rejected() {
        let err = check_empirical_honesty("tests failed", &passing_result()).unwrap_err();
        assert!(matches!(err, CoreError::Enforcement(_)));
    }

    #[test]
    fn unclear_claim_does_not_conflict_with_either_outcome() {
        assert!(check_empirical_honesty("implemented the feature", &passing_result()).is_ok());
        assert!(check_empirical_honesty("implemented the feature", &failing_result()).is_ok());
    }
}
