//! Search orchestration: query text to ranked, deduplicated result paths.
//!
//! # Responsibility
//! - Run lex, structure, parse and evaluate for one query.
//! - Scope evaluation to the hoisted subtree.
//! - Map notes to display paths, dedupe, order and limit them.
//!
//! # Invariants
//! - Blank queries return no results and never touch the graph.
//! - Parse diagnostics are non-fatal and returned beside the results.
//! - Evaluation errors abort the query; the graph is never modified.
//!
//! # See also
//! - `search::parser` for the query grammar.

use super::context::{ParseError, ParsingContext};
use super::content::{ContentDecryptor, NoteContentProvider};
use super::expression::{EvaluationError, Expression, SearchContext};
use super::highlight::highlight_results;
use super::note_set::NoteSet;
use super::parser::parse_query_to_expression;
use crate::cache::GraphCache;
use crate::model::{NoteId, ROOT_NOTE_ID};
use log::{error, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Result cap of trimmed and autocomplete searches.
pub const MAX_TRIMMED_RESULTS: usize = 200;

/// Fatal search failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    Evaluation(EvaluationError),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Evaluation(err) => write!(f, "search evaluation failed: {err}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Evaluation(err) => Some(err),
        }
    }
}

impl From<EvaluationError> for SearchError {
    fn from(value: EvaluationError) -> Self {
        Self::Evaluation(value)
    }
}

/// Per-search options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Also scan note bodies for fulltext tokens.
    pub include_note_content: bool,
    /// Prefix-match attribute names and relax `=` to "contains".
    pub fuzzy_attribute_search: bool,
    /// Results must lie below this note.
    pub hoisted_note_id: NoteId,
    /// Caps the final result list.
    pub limit: Option<usize>,
}

impl SearchOptions {
    /// Default options scoped to `hoisted_note_id`.
    pub fn hoisted(hoisted_note_id: impl Into<NoteId>) -> Self {
        Self {
            hoisted_note_id: hoisted_note_id.into(),
            ..Self::default()
        }
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            include_note_content: true,
            fuzzy_attribute_search: false,
            hoisted_note_id: ROOT_NOTE_ID.to_string(),
            limit: None,
        }
    }
}

/// One matched note with its display path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Note ids from the root down to the matched note.
    pub note_path: Vec<NoteId>,
    pub note_path_title: String,
    /// Only filled by autocomplete searches.
    pub highlighted_note_path_title: Option<String>,
}

impl SearchResult {
    pub fn note_id(&self) -> &str {
        self.note_path.last().map(String::as_str).unwrap_or_default()
    }

    /// Ids joined by `/`.
    pub fn note_path_string(&self) -> String {
        self.note_path.join("/")
    }
}

/// Results plus the first parse diagnostic, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub error: Option<ParseError>,
}

/// First [`MAX_TRIMMED_RESULTS`] results and the untrimmed count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrimmedSearchResults {
    pub count: usize,
    pub results: Vec<SearchResult>,
    pub error: Option<ParseError>,
}

/// Search entry point over one graph cache.
pub struct SearchService<'a> {
    graph: &'a GraphCache,
    content_provider: Option<&'a dyn NoteContentProvider>,
    decryptor: Option<&'a dyn ContentDecryptor>,
}

impl<'a> SearchService<'a> {
    pub fn new(graph: &'a GraphCache) -> Self {
        Self {
            graph,
            content_provider: None,
            decryptor: None,
        }
    }

    /// Enables content scans of unprotected notes.
    pub fn with_content_provider(mut self, provider: &'a dyn NoteContentProvider) -> Self {
        self.content_provider = Some(provider);
        self
    }

    /// Enables content scans of protected notes.
    pub fn with_decryptor(mut self, decryptor: &'a dyn ContentDecryptor) -> Self {
        self.decryptor = Some(decryptor);
        self
    }

    /// Runs `query` and returns ranked results.
    ///
    /// # Errors
    /// - `SearchError::Evaluation` when the parsed expression cannot be
    ///   evaluated.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchOutcome, SearchError> {
        if query.trim().is_empty() {
            return Ok(SearchOutcome::default());
        }

        let mut context =
            ParsingContext::new(options.include_note_content, options.fuzzy_attribute_search);
        let results = self.find_notes_with_query(query, options, &mut context, "standard")?;
        Ok(SearchOutcome {
            results,
            error: context.error,
        })
    }

    /// Like [`SearchService::search`], keeping at most [`MAX_TRIMMED_RESULTS`].
    ///
    /// # Errors
    /// - Same as [`SearchService::search`].
    pub fn search_trimmed(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<TrimmedSearchResults, SearchError> {
        let SearchOutcome { mut results, error } = self.search(query, options)?;
        let count = results.len();
        results.truncate(MAX_TRIMMED_RESULTS);
        Ok(TrimmedSearchResults {
            count,
            results,
            error,
        })
    }

    /// Type-ahead search: fuzzy attribute matching, no content scan,
    /// highlighted titles.
    ///
    /// Only `hoisted_note_id` and `limit` are taken from `options`.
    ///
    /// # Errors
    /// - Same as [`SearchService::search`].
    pub fn search_for_autocomplete(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchOutcome, SearchError> {
        if query.trim().is_empty() {
            return Ok(SearchOutcome::default());
        }

        let options = SearchOptions {
            include_note_content: false,
            fuzzy_attribute_search: true,
            ..options.clone()
        };
        let mut context = ParsingContext::new(false, true);
        let mut results = self.find_notes_with_query(query, &options, &mut context, "autocomplete")?;
        results.truncate(MAX_TRIMMED_RESULTS);
        highlight_results(self.graph, &mut results, &context.highlighted_tokens);

        Ok(SearchOutcome {
            results,
            error: context.error,
        })
    }

    /// Evaluates an already parsed expression.
    ///
    /// # Errors
    /// - `SearchError::Evaluation` when evaluation fails.
    pub fn find_notes_with_expression(
        &self,
        expression: &Expression,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let hoisted = self.effective_hoisted(&options.hoisted_note_id);
        let input = if hoisted == ROOT_NOTE_ID {
            NoteSet::from_ids(self.graph.note_ids().cloned())
        } else {
            NoteSet::from_ids(self.graph.subtree_notes(hoisted))
        };

        let notes = expression.execute(&input, &self.search_context())?;

        let mut seen: HashSet<&str> = HashSet::new();
        let mut results = Vec::new();
        for note_id in &notes {
            if !seen.insert(note_id.as_str()) {
                continue;
            }
            let Some(note_path) = self.graph.some_path(note_id, hoisted) else {
                continue;
            };
            if !note_path.iter().any(|id| id == hoisted) {
                continue;
            }
            results.push(SearchResult {
                note_path_title: self.graph.note_title_for_path(&note_path, hoisted),
                note_path,
                highlighted_note_path_title: None,
            });
        }

        if !notes.sorted {
            // Shallower notes first.
            results.sort_by(|left, right| {
                left.note_path
                    .len()
                    .cmp(&right.note_path.len())
                    .then_with(|| left.note_path_title.cmp(&right.note_path_title))
            });
        }

        if let Some(limit) = expression.unordered_limit() {
            results.truncate(limit);
        }
        if let Some(limit) = options.limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    fn find_notes_with_query(
        &self,
        query: &str,
        options: &SearchOptions,
        context: &mut ParsingContext,
        mode: &str,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let started_at = Instant::now();
        let expression = parse_query_to_expression(query, context);
        if let Some(err) = &context.error {
            warn!("event=parse_error module=search status=error mode={mode} error={err}");
        }
        let Some(expression) = expression else {
            info!(
                "event=search module=search status=ok mode={mode} results=0 duration_ms={}",
                started_at.elapsed().as_millis()
            );
            return Ok(Vec::new());
        };

        match self.find_notes_with_expression(&expression, options) {
            Ok(results) => {
                info!(
                    "event=search module=search status=ok mode={mode} results={} duration_ms={}",
                    results.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(results)
            }
            Err(err) => {
                error!(
                    "event=search module=search status=error mode={mode} duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }

    fn search_context(&self) -> SearchContext<'a> {
        let mut context = SearchContext::new(self.graph);
        if let Some(provider) = self.content_provider {
            context = context.with_content_provider(provider);
        }
        if let Some(decryptor) = self.decryptor {
            context = context.with_decryptor(decryptor);
        }
        context
    }

    /// Unknown hoisted notes fall back to the root.
    fn effective_hoisted<'h>(&self, hoisted_note_id: &'h str) -> &'h str {
        if self.graph.note(hoisted_note_id).is_some() {
            hoisted_note_id
        } else {
            ROOT_NOTE_ID
        }
    }
}
