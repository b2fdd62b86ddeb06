//! Reviewer-vote parser (component A).

use once_cell::sync::Lazy;
use regex::Regex;
use tcr_contracts::Vote;

static REJECT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bREJECT\b").unwrap());
static REQUEST_CHANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bREQUEST[ _]CHANGE\b").unwrap());
static APPROVE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bAPPROVE\b").unwrap());

/// Outcome of scanning a reviewer's free-form text for a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedVote {
    pub vote: Vote,
    pub found: bool,
}

/// Scan reviewer text for a case-insensitive whole-word vote marker.
///
/// Precedence order regardless of position in the text: `REJECT` beats
/// `REQUEST_CHANGE` beats `APPROVE`. A review containing no recognizable
/// marker defaults to `REQUEST_CHANGE` with `found = false`, so callers
/// can treat unparsable reviews as non-approvals without special-casing
/// them.
pub fn parse_vote(text: &str) -> ParsedVote {
    if REJECT_RE.is_match(text) {
        return ParsedVote {
            vote: Vote::Reject,
            found: true,
        };
    }
    if REQUEST_CHANGE_RE.is_match(text) {
        return ParsedVote {
            vote: Vote::RequestChange,
            found: true,
        };
    }
    if APPROVE_RE.is_match(text) {
        return ParsedVote {
            vote: Vote::Approve,
            found: true,
        };
    }
    ParsedVote {
        vote: Vote::RequestChange,
        found: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_wins_over_approve_regardless_of_position() {
        let parsed = parse_vote("APPROVE, wait, actually I REJECT this change.");
        assert_eq!(parsed.vote, Vote::Reject);
        assert!(parsed.found);
    }

    #[test]
    fn reject_wins_over_request_change() {
        let parsed = parse_vote("REQUEST_CHANGE but on reflection I REJECT it.");
        assert_eq!(parsed.vote, Vote::Reject);
    }

    #[test]
    fn request_change_space_variant_recognized() {
        let parsed = parse_vote("REQUEST CHANGE: please add more tests.");
        assert_eq!(parsed.vote, Vote::RequestChange);
        assert!(parsed.found);
    }

    #[test]
    fn clean_approve() {
        let parsed = parse_vote("Looks good. APPROVE.");
        assert_eq!(parsed.vote, Vote::Approve);
        assert!(parsed.found);
    }

    #[test]
    fn unparsable_text_defaults_to_request_change_not_found() {
        let parsed = parse_vote("This is a fine change, nicely done.");
        assert_eq!(parsed.vote, Vote::RequestChange);
        assert!(!parsed.found);
    }

    #[test]
    fn case_insensitive_and_whole_word() {
        // "disapprove" should not match APPROVE as a whole word.
        let parsed = parse_vote("I disapprove of this reapproval process.");
        assert!(!parsed.found);
    }
}
