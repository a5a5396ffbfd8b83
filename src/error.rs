//! Error types.
//!
//! Registry operations never fail on unknown ids; the only fallible input is a
//! selector string handed to an element query.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected `{found}` at offset {offset} in selector `{selector}`")]
    UnexpectedChar {
        selector: String,
        found: char,
        offset: usize,
    },
    #[error("expected a name after `{prefix}` at offset {offset} in selector `{selector}`")]
    MissingName {
        selector: String,
        prefix: char,
        offset: usize,
    },
    #[error("unterminated attribute selector in `{0}`")]
    UnterminatedAttribute(String),
    #[error("selector `{0}` ends with a combinator")]
    DanglingCombinator(String),
}
