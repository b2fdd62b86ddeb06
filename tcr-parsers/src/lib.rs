//! Deterministic parsers that turn free-form tool output into typed
//! values (component A). Each parser is a pure function: no I/O, no
//! shared state, and parsing the same input twice yields identical
//! output.

pub mod lint_parser;
pub mod test_parser;
pub mod vote_parser;

pub use lint_parser::parse_lint_output;
pub use test_parser::parse_test_output;
pub use vote_parser::{parse_vote, ParsedVote};
