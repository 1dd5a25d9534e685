//! Query pipeline: lexer, paren structurer, parser, evaluator, orchestrator.
//!
//! # Responsibility
//! - Turn query text into an [`Expression`] and evaluate it over a
//!   [`crate::cache::GraphCache`].
//! - Expose ranked, deduplicated result paths to callers.
//!
//! # See also
//! - `service` for the only caller-facing search API.

pub mod comparator;
pub mod content;
pub mod context;
pub mod expression;
mod highlight;
pub mod lexer;
pub mod note_set;
pub mod parens;
pub mod parser;
pub mod service;

pub use comparator::{Comparator, ComparatorError, ComparisonOperator};
pub use content::{ContentDecryptor, DecryptionError, NoteContentProvider};
pub use context::{ParseError, ParsingContext};
pub use expression::{
    EvaluationError, Expression, NoteProperty, OrderDefinition, OrderDirection, OrderKey,
    SearchContext,
};
pub use lexer::{lex, LexResult, Token};
pub use note_set::NoteSet;
pub use parens::{structure, TokenTree};
pub use parser::{parse, parse_query_to_expression};
pub use service::{
    SearchError, SearchOptions, SearchOutcome, SearchResult, SearchService,
    TrimmedSearchResults, MAX_TRIMMED_RESULTS,
};
