//! Value comparators used by attribute and property predicates.
//!
//! Comparison is case-insensitive. `=`/`!=` and the ordering operators
//! compare numerically when both sides parse as numbers.

use super::context::ParseError;
use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Supported comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    Contains,
    EndsWith,
    StartsWith,
    Regex,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl ComparisonOperator {
    pub fn parse(operator: &str) -> Option<Self> {
        match operator {
            "=" => Some(Self::Equal),
            "!=" => Some(Self::NotEqual),
            "*=*" => Some(Self::Contains),
            "*=" => Some(Self::EndsWith),
            "=*" => Some(Self::StartsWith),
            "%=" => Some(Self::Regex),
            ">" => Some(Self::Greater),
            ">=" => Some(Self::GreaterOrEqual),
            "<" => Some(Self::Less),
            "<=" => Some(Self::LessOrEqual),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Contains => "*=*",
            Self::EndsWith => "*=",
            Self::StartsWith => "=*",
            Self::Regex => "%=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
        }
    }
}

impl Display for ComparisonOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an expression token is an operator (known or not).
pub fn is_operator_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(super::lexer::is_operator_char)
}

/// Comparator construction failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparatorError {
    UnknownOperator(String),
    InvalidRegex { pattern: String, message: String },
}

impl Display for ComparatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownOperator(operator) => write!(f, "unknown operator `{operator}`"),
            Self::InvalidRegex { pattern, message } => {
                write!(f, "invalid regex `{pattern}`: {message}")
            }
        }
    }
}

impl Error for ComparatorError {}

impl From<ComparatorError> for ParseError {
    fn from(value: ComparatorError) -> Self {
        match value {
            ComparatorError::UnknownOperator(operator) => Self::UnknownOperator(operator),
            ComparatorError::InvalidRegex { pattern, message } => {
                Self::InvalidRegex { pattern, message }
            }
        }
    }
}

/// Operator bound to its compared value.
#[derive(Debug, Clone)]
pub struct Comparator {
    operator: ComparisonOperator,
    value: String,
    number: Option<f64>,
    regex: Option<Regex>,
}

impl PartialEq for Comparator {
    fn eq(&self, other: &Self) -> bool {
        self.operator == other.operator && self.value == other.value
    }
}

impl Comparator {
    /// Builds a comparator from operator text and compared value.
    ///
    /// # Errors
    /// - `UnknownOperator` for operator text outside the supported set.
    /// - `InvalidRegex` when `%=` is given an invalid pattern.
    pub fn build(operator: &str, value: &str) -> Result<Self, ComparatorError> {
        let operator = ComparisonOperator::parse(operator)
            .ok_or_else(|| ComparatorError::UnknownOperator(operator.to_string()))?;
        Self::new(operator, value)
    }

    pub fn new(operator: ComparisonOperator, value: &str) -> Result<Self, ComparatorError> {
        let value = value.to_lowercase();
        let regex = match operator {
            ComparisonOperator::Regex => Some(
                RegexBuilder::new(&value)
                    .case_insensitive(true)
                    .build()
                    .map_err(|err| ComparatorError::InvalidRegex {
                        pattern: value.clone(),
                        message: err.to_string(),
                    })?,
            ),
            _ => None,
        };

        Ok(Self {
            operator,
            number: parse_number(&value),
            value,
            regex,
        })
    }

    pub fn operator(&self) -> ComparisonOperator {
        self.operator
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Tests `candidate` against the compared value.
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = candidate.to_lowercase();
        match self.operator {
            ComparisonOperator::Equal => self.ordering(&candidate) == Ordering::Equal,
            ComparisonOperator::NotEqual => self.ordering(&candidate) != Ordering::Equal,
            ComparisonOperator::Contains => candidate.contains(&self.value),
            ComparisonOperator::EndsWith => candidate.ends_with(&self.value),
            ComparisonOperator::StartsWith => candidate.starts_with(&self.value),
            ComparisonOperator::Regex => self
                .regex
                .as_ref()
                .is_some_and(|regex| regex.is_match(&candidate)),
            ComparisonOperator::Greater => self.ordering(&candidate) == Ordering::Greater,
            ComparisonOperator::GreaterOrEqual => self.ordering(&candidate) != Ordering::Less,
            ComparisonOperator::Less => self.ordering(&candidate) == Ordering::Less,
            ComparisonOperator::LessOrEqual => self.ordering(&candidate) != Ordering::Greater,
        }
    }

    /// Ordering of `candidate` relative to the compared value.
    fn ordering(&self, candidate: &str) -> Ordering {
        match (parse_number(candidate), self.number) {
            (Some(left), Some(right)) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
            _ => candidate.cmp(self.value.as_str()),
        }
    }
}

pub(crate) fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|number| number.is_finite())
}
