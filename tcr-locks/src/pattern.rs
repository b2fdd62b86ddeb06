//! Glob pattern overlap test.
//!
//! Two patterns overlap iff there exists at least one path matching
//! both. `**` absorbs zero or more path segments, `*` absorbs any
//! substring within one segment, `?` absorbs a single character. This
//! is the under-specified "lock-pattern overlap" open question from the
//! design doc's §9: when ambiguous, this implementation is conservative
//! and returns `true` (more conflicts, never fewer).

fn segment_chars_overlap(a: &[char], b: &[char]) -> bool {
    match (a.first(), b.first()) {
        (None, None) => true,
        (None, Some(_)) => b.iter().all(|&c| c == '*'),
        (Some(_), None) => a.iter().all(|&c| c == '*'),
        (Some(&ca), Some(&cb)) => {
            if ca == '*' {
                segment_chars_overlap(&a[1..], b) || segment_chars_overlap(a, &b[1..])
            } else if cb == '*' {
                segment_chars_overlap(a, &b[1..]) || segment_chars_overlap(&a[1..], b)
            } else if ca == '?' || cb == '?' || ca == cb {
                segment_chars_overlap(&a[1..], &b[1..])
            } else {
                false
            }
        }
    }
}

/// Whether two single path-segment globs (each may use `*` / `?`, but
/// not `**`) can match a common string.
fn segment_overlap(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    segment_chars_overlap(&a_chars, &b_chars)
}

fn segments_overlap(a: &[&str], b: &[&str]) -> bool {
    match (a.first(), b.first()) {
        (None, None) => true,
        (None, Some(_)) => b.iter().all(|&s| s == "**"),
        (Some(_), None) => a.iter().all(|&s| s == "**"),
        (Some(&sa), Some(&sb)) => {
            if sa == "**" {
                segments_overlap(&a[1..], b) || segments_overlap(a, &b[1..])
            } else if sb == "**" {
                segments_overlap(a, &b[1..]) || segments_overlap(&a[1..], b)
            } else if segment_overlap(sa, sb) {
                segments_overlap(&a[1..], &b[1..])
            } else {
                false
            }
        }
    }
}

/// Whether two path patterns could both match at least one common path.
pub fn patterns_overlap(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let a_segs: Vec<&str> = a.split('/').collect();
    let b_segs: Vec<&str> = b.split('/').collect();
    segments_overlap(&a_segs, &b_segs)
}
