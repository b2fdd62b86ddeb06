//! Reviewer vote aggregation (component I).
//!
//! Pure functions over a `&[ReviewVote]` slice produced by the
//! `multi_review` gate once all reviewer prompts have returned and been
//! parsed. No I/O, no knowledge of how the votes were gathered.

use std::collections::HashMap;
use tcr_contracts::{ReviewType, ReviewVote, Vote};

/// True iff there is at least one vote and every vote is `APPROVE`.
pub fn check_unanimous_approval(votes: &[ReviewVote]) -> bool {
    !votes.is_empty() && votes.iter().all(|v| v.vote == Vote::Approve)
}

/// Builds the retry-prompt blob handed back to `fix_from_feedback` when
/// review is not unanimous. Returns `None` when it is (nothing to fix).
///
/// Non-approvals are grouped by review type in a fixed order
/// (testing, functional, architecture) so the blob is stable across
/// runs regardless of HashMap iteration order. Within a group, each
/// reviewer contributes a `[VOTE] reviewer` header followed by at most
/// their first three non-empty feedback lines.
pub fn aggregate_review_feedback(votes: &[ReviewVote]) -> Option<String> {
    if check_unanimous_approval(votes) {
        return None;
    }

    let mut by_type: HashMap<ReviewType, Vec<&ReviewVote>> = HashMap::new();
    for vote in votes.iter().filter(|v| v.vote != Vote::Approve) {
        by_type.entry(vote.review_type).or_default().push(vote);
    }

    let mut blob = String::new();
    for review_type in [ReviewType::Testing, ReviewType::Functional, ReviewType::Architecture] {
        let Some(group) = by_type.get(&review_type) else {
            continue;
        };
        blob.push_str(&format!("## {review_type}\n"));
        for vote in group {
            blob.push_str(&format!("[{}] {}\n", vote.vote, vote.reviewer));
            for line in vote.feedback.lines().map(str::trim).filter(|l| !l.is_empty()).take(3) {
                blob.push_str(&format!("  {line}\n"));
            }
        }
        blob.push('\n');
    }
    blob.push_str("Address the feedback above and resubmit for review.\n");
    Some(blob)
}

/// Short human-readable summary, e.g. `"2 reviewer(s) rejected, 1 requested changes"`.
pub fn get_rejection_summary(votes: &[ReviewVote]) -> String {
    let rejected = votes.iter().filter(|v| v.vote == Vote::Reject).count();
    let changes = votes.iter().filter(|v| v.vote == Vote::RequestChange).count();

    let mut parts = Vec::new();
    if rejected > 0 {
        parts.push(format!("{rejected} reviewer(s) rejected"));
    }
    if changes > 0 {
        parts.push(format!("{changes} requested changes"));
    }
    if parts.is_empty() {
        "all reviewers approved".to_string()
    } else {
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(reviewer: &str, review_type: ReviewType, v: Vote, feedback: &str) -> ReviewVote {
        ReviewVote {
            reviewer: reviewer.to_string(),
            review_type,
            vote: v,
            feedback: feedback.to_string(),
            duration_ms: 100,
        }
    }

    #[test]
    fn unanimous_approval_requires_non_empty_and_all_approve() {
        assert!(!check_unanimous_approval(&[]));
        let votes = vec![
            vote("r1", ReviewType::Testing, Vote::Approve, ""),
            vote("r2", ReviewType::Functional, Vote::Approve, ""),
        ];
        assert!(check_unanimous_approval(&votes));
    }

    #[test]
    fn one_rejection_breaks_unanimity() {
        let votes = vec![
            vote("r1", ReviewType::Testing, Vote::Approve, ""),
            vote("r2", ReviewType::Functional, Vote::Reject, "missing edge case"),
        ];
        assert!(!check_unanimous_approval(&votes));
    }

    #[test]
    fn unanimous_approval_skips_aggregation() {
        let votes = vec![vote("r1", ReviewType::Testing, Vote::Approve, "")];
        assert!(aggregate_review_feedback(&votes).is_none());
    }

    #[test]
    fn aggregation_groups_by_review_type_and_caps_feedback_lines() {
        let votes = vec![
            vote(
                "r1",
                ReviewType::Functional,
                Vote::RequestChange,
                "line one\n\nline two\nline three\nline four (dropped)",
            ),
            vote("r2", ReviewType::Testing, Vote::Reject, "missing a case"),
        ];
        let blob = aggregate_review_feedback(&votes).unwrap();
        let testing_pos = blob.find("## testing").unwrap();
        let functional_pos = blob.find("## functional").unwrap();
        assert!(testing_pos < functional_pos, "testing group must come before functional");
        assert!(blob.contains("[REQUEST_CHANGE] r1"));
        assert!(blob.contains("line three"));
        assert!(!blob.contains("line four"));
        assert!(blob.ends_with("resubmit for review.\n"));
    }

    #[test]
    fn rejection_summary_matches_expected_format() {
        let votes = vec![
            vote("r1", ReviewType::Testing, Vote::Reject, ""),
            vote("r2", ReviewType::Functional, Vote::Reject, ""),
            vote("r3", ReviewType::Architecture, Vote::RequestChange, ""),
        ];
        assert_eq!(get_rejection_summary(&votes), "2 reviewer(s) rejected, 1 requested changes");
    }

    #[test]
    fn rejection_summary_all_approved() {
        let votes = vec![vote("r1", ReviewType::Testing, Vote::Approve, "")];
        assert_eq!(get_rejection_summary(&votes), "all reviewers approved");
    }
}
