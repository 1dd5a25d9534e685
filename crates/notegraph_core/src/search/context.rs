//! Per-query parsing context and the non-fatal parse diagnostic.
//!
//! # Invariants
//! - Only the first error is kept; later ones are usually its consequence.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Non-fatal query diagnostic; parsing continues after it is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Operator token without an attribute or property before it.
    MisplacedOperator(String),
    /// Token that starts no known expression.
    UnrecognizedExpression(String),
    /// `not` must be followed by a parenthesized group.
    NotWithoutGroup { found: Option<String> },
    /// A property path segment was expected to start with `.`.
    ExpectedDot { found: Option<String> },
    /// Path ends right after `.`.
    DanglingDot,
    /// Marker with no name (`#!`, `~!`).
    EmptyAttributeName(String),
    /// Operator is not followed by a value token.
    MissingValue { operator: String },
    UnknownOperator(String),
    InvalidRegex { pattern: String, message: String },
    InvalidLimit(String),
    /// `orderby` / `limit` used inside a parenthesized group.
    MisplacedOrdering(String),
    UnbalancedParenthesis { unclosed: usize, stray: usize },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MisplacedOperator(token) => {
                write!(f, "misplaced or incomplete expression \"{token}\"")
            }
            Self::UnrecognizedExpression(token) => write!(f, "unrecognized expression \"{token}\""),
            Self::NotWithoutGroup { found } => write!(
                f,
                "not keyword should be followed by sub-expression in parenthesis, got {}",
                found.as_deref().unwrap_or("end of query")
            ),
            Self::ExpectedDot { found } => write!(
                f,
                "expected \".\" to separate field path, got {}",
                found.as_deref().unwrap_or("end of query")
            ),
            Self::DanglingDot => write!(f, "field path ends with \".\""),
            Self::EmptyAttributeName(token) => write!(f, "attribute name is missing in \"{token}\""),
            Self::MissingValue { operator } => {
                write!(f, "operator \"{operator}\" is missing a compared value")
            }
            Self::UnknownOperator(operator) => write!(f, "can't find operator \"{operator}\""),
            Self::InvalidRegex { pattern, message } => {
                write!(f, "invalid regular expression \"{pattern}\": {message}")
            }
            Self::InvalidLimit(value) => write!(f, "limit must be a non-negative integer, got \"{value}\""),
            Self::MisplacedOrdering(keyword) => {
                write!(f, "\"{keyword}\" is allowed only at the top level of the query")
            }
            Self::UnbalancedParenthesis { unclosed, stray } => write!(
                f,
                "unbalanced parenthesis: {unclosed} unclosed, {stray} without opening"
            ),
        }
    }
}

impl Error for ParseError {}

/// Options and collected side results of parsing one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsingContext {
    /// Scan note content for fulltext tokens.
    pub include_note_content: bool,
    /// Prefix-match attribute names and relax `=` to "contains".
    pub fuzzy_attribute_search: bool,
    /// Tokens to highlight in autocomplete titles.
    pub highlighted_tokens: Vec<String>,
    pub original_query: String,
    /// First recorded diagnostic.
    pub error: Option<ParseError>,
}

impl ParsingContext {
    pub fn new(include_note_content: bool, fuzzy_attribute_search: bool) -> Self {
        Self {
            include_note_content,
            fuzzy_attribute_search,
            ..Self::default()
        }
    }

    /// Records `error` unless an earlier one is already present.
    pub fn add_error(&mut self, error: ParseError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub(crate) fn highlight(&mut self, token: &str) {
        if !token.is_empty() {
            self.highlighted_tokens.push(token.to_string());
        }
    }
}
