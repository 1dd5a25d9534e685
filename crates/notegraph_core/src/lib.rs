//! Embedded query engine over a hierarchical, attribute-tagged note graph.
//! The graph cache is the only live copy of the graph inside the engine.

pub mod cache;
pub mod logging;
pub mod model;
pub mod search;

pub use cache::GraphCache;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::attribute::{Attribute, AttributeRow, AttributeType};
pub use model::branch::{Branch, BranchRow};
pub use model::note::{Note, NoteRow};
pub use model::snapshot::{GraphLoader, GraphSnapshot, LoadError};
pub use model::{AttributeId, BranchId, NoteId, ROOT_NOTE_ID};
pub use search::{
    lex, parse_query_to_expression, ContentDecryptor, DecryptionError, EvaluationError,
    Expression, NoteContentProvider, ParseError, ParsingContext, SearchError, SearchOptions,
    SearchOutcome, SearchResult, SearchService, TrimmedSearchResults,
};
