//! Expression tree and its evaluation against the graph cache.
//!
//! # Responsibility
//! - Model every query predicate and combinator as one closed enum.
//! - Evaluate an expression over an input note set.
//!
//! # Invariants
//! - Evaluation only reads the graph.
//! - Every variant is a filter: its result is a subset of its input.
//!   The single exception is the truncation done by a top-level ordering.
//! - Attribute matches expand through inheritance before intersecting:
//!   inheritable attributes cover the owner's subtree (templated notes
//!   included), template notes cover the notes templated from them.
//!
//! # See also
//! - `search::parser` for how queries map onto variants.

use super::comparator::{parse_number, Comparator, ComparisonOperator};
use super::content::{is_scannable_type, searchable_content, ContentDecryptor, NoteContentProvider};
use super::note_set::NoteSet;
use crate::cache::GraphCache;
use crate::model::attribute::{Attribute, AttributeType};
use crate::model::note::Note;
use crate::model::NoteId;
use log::info;
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Graph and collaborators an expression is evaluated against.
#[derive(Clone, Copy)]
pub struct SearchContext<'a> {
    pub graph: &'a GraphCache,
    content_provider: Option<&'a dyn NoteContentProvider>,
    decryptor: Option<&'a dyn ContentDecryptor>,
}

impl<'a> SearchContext<'a> {
    pub fn new(graph: &'a GraphCache) -> Self {
        Self {
            graph,
            content_provider: None,
            decryptor: None,
        }
    }

    pub fn with_content_provider(mut self, provider: &'a dyn NoteContentProvider) -> Self {
        self.content_provider = Some(provider);
        self
    }

    pub fn with_decryptor(mut self, decryptor: &'a dyn ContentDecryptor) -> Self {
        self.decryptor = Some(decryptor);
        self
    }

    fn all_notes(&self) -> NoteSet {
        NoteSet::from_ids(self.graph.note_ids().cloned())
    }
}

/// Failure that aborts evaluation of the current query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// Content can only be searched with `*=*`.
    UnsupportedContentOperator(ComparisonOperator),
    /// Boolean properties only support `=` and `!=`.
    UnsupportedBooleanOperator {
        property: NoteProperty,
        operator: ComparisonOperator,
    },
}

impl Display for EvaluationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedContentOperator(operator) => write!(
                f,
                "note content can be searched only with *=* operator, got {operator}"
            ),
            Self::UnsupportedBooleanOperator { property, operator } => write!(
                f,
                "unrecognized operator {operator} for boolean property {property}"
            ),
        }
    }
}

impl Error for EvaluationError {}

/// Note property addressable as `note.<name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteProperty {
    NoteId,
    Title,
    Type,
    Mime,
    IsProtected,
    IsArchived,
    DateCreated,
    DateModified,
    UtcDateCreated,
    UtcDateModified,
    ContentLength,
    ParentCount,
    ChildrenCount,
    AttributeCount,
    LabelCount,
    RelationCount,
}

impl NoteProperty {
    /// Property for a lowercase path segment.
    pub fn parse(name: &str) -> Option<Self> {
        let property = match name {
            "noteid" => Self::NoteId,
            "title" => Self::Title,
            "type" => Self::Type,
            "mime" => Self::Mime,
            "isprotected" => Self::IsProtected,
            "isarchived" => Self::IsArchived,
            "datecreated" => Self::DateCreated,
            "datemodified" => Self::DateModified,
            "utcdatecreated" => Self::UtcDateCreated,
            "utcdatemodified" => Self::UtcDateModified,
            "contentlength" => Self::ContentLength,
            "parentcount" => Self::ParentCount,
            "childrencount" => Self::ChildrenCount,
            "attributecount" => Self::AttributeCount,
            "labelcount" => Self::LabelCount,
            "relationcount" => Self::RelationCount,
            _ => return None,
        };
        Some(property)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoteId => "noteid",
            Self::Title => "title",
            Self::Type => "type",
            Self::Mime => "mime",
            Self::IsProtected => "isprotected",
            Self::IsArchived => "isarchived",
            Self::DateCreated => "datecreated",
            Self::DateModified => "datemodified",
            Self::UtcDateCreated => "utcdatecreated",
            Self::UtcDateModified => "utcdatemodified",
            Self::ContentLength => "contentlength",
            Self::ParentCount => "parentcount",
            Self::ChildrenCount => "childrencount",
            Self::AttributeCount => "attributecount",
            Self::LabelCount => "labelcount",
            Self::RelationCount => "relationcount",
        }
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, Self::IsProtected | Self::IsArchived)
    }

    /// Current value for `note`; `None` when the note lacks it.
    pub fn value(self, graph: &GraphCache, note: &Note) -> Option<String> {
        let id = note.note_id.as_str();
        match self {
            Self::NoteId => Some(note.note_id.clone()),
            Self::Title => Some(note.title.clone()),
            Self::Type => Some(note.note_type.clone()),
            Self::Mime => Some(note.mime.clone()),
            Self::IsProtected => Some(note.is_protected.to_string()),
            Self::IsArchived => Some(graph.is_archived(id).to_string()),
            Self::DateCreated => note.date_created.clone(),
            Self::DateModified => note.date_modified.clone(),
            Self::UtcDateCreated => note.utc_date_created.clone(),
            Self::UtcDateModified => note.utc_date_modified.clone(),
            Self::ContentLength => note.content_length.map(|len| len.to_string()),
            Self::ParentCount => Some(graph.parent_count(id).to_string()),
            Self::ChildrenCount => Some(graph.children_count(id).to_string()),
            Self::AttributeCount => Some(graph.attribute_count(id).to_string()),
            Self::LabelCount => Some(graph.label_count(id).to_string()),
            Self::RelationCount => Some(graph.relation_count(id).to_string()),
        }
    }
}

impl Display for NoteProperty {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an ordering clause sorts by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderKey {
    Property(NoteProperty),
    Label(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDefinition {
    pub key: OrderKey,
    pub direction: OrderDirection,
}

impl OrderDefinition {
    fn value(&self, graph: &GraphCache, note: &Note) -> Option<String> {
        match &self.key {
            OrderKey::Property(property) => property.value(graph, note),
            OrderKey::Label(name) => graph.label_value(&note.note_id, name),
        }
    }
}

/// Query expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    And(Vec<Expression>),
    Or(Vec<Expression>),
    /// Complement within the input set.
    Not(Box<Expression>),
    /// Every token is contained in the note's flat text.
    Fulltext { tokens: Vec<String> },
    /// Every token is contained in the body of an unprotected note.
    NoteContent {
        operator: ComparisonOperator,
        tokens: Vec<String>,
    },
    /// Every token is contained in the decrypted body of a protected note.
    ProtectedContent {
        operator: ComparisonOperator,
        tokens: Vec<String>,
    },
    AttributeExists {
        kind: AttributeType,
        name: String,
        /// Match attribute names by prefix (fuzzy mode).
        prefix_match: bool,
    },
    AttributeCompare {
        kind: AttributeType,
        name: String,
        comparator: Comparator,
    },
    /// Notes owning a relation `name` whose target satisfies the sub-expression.
    RelationWhere { name: String, sub: Box<Expression> },
    /// Notes inside the subtree of any note (of the whole graph) matching.
    DescendantOf(Box<Expression>),
    /// Notes with at least one parent matching.
    ChildOf(Box<Expression>),
    /// Notes with at least one child matching.
    ParentOf(Box<Expression>),
    PropertyComparison {
        property: NoteProperty,
        comparator: Comparator,
    },
    OrderByAndLimit {
        inner: Box<Expression>,
        order: Vec<OrderDefinition>,
        limit: Option<usize>,
    },
}

impl Expression {
    /// Evaluates this expression over `input`.
    ///
    /// # Errors
    /// - `EvaluationError` for operator/property combinations that cannot be
    ///   evaluated. The graph is left untouched.
    pub fn execute(
        &self,
        input: &NoteSet,
        context: &SearchContext<'_>,
    ) -> Result<NoteSet, EvaluationError> {
        let graph = context.graph;
        match self {
            Self::And(children) => {
                let mut current = input.clone();
                for child in children {
                    current = child.execute(&current, context)?;
                }
                Ok(current)
            }
            Self::Or(children) => {
                let mut result = NoteSet::new();
                for child in children {
                    result.add_all(&child.execute(input, context)?);
                }
                Ok(result)
            }
            Self::Not(sub) => Ok(input.minus(&sub.execute(input, context)?)),
            Self::Fulltext { tokens } => Ok(filter(input, |note_id| {
                let text = graph.flat_text(note_id);
                tokens.iter().all(|token| text.contains(token.as_str()))
            })),
            Self::NoteContent { operator, tokens } => {
                ensure_content_operator(*operator)?;
                Ok(scan_content(input, context, tokens))
            }
            Self::ProtectedContent { operator, tokens } => {
                ensure_content_operator(*operator)?;
                Ok(scan_protected_content(input, context, tokens))
            }
            Self::AttributeExists {
                kind,
                name,
                prefix_match,
            } => {
                let attribute_ids = if *prefix_match {
                    graph.find_attributes_with_prefix(*kind, name)
                } else {
                    graph.find_attributes(*kind, name).to_vec()
                };
                let mut candidates = NoteSet::new();
                for attr in attribute_ids.iter().filter_map(|id| graph.attribute(id)) {
                    add_affected_notes(graph, attr, &mut candidates);
                }
                Ok(input.intersection(&candidates))
            }
            Self::AttributeCompare {
                kind,
                name,
                comparator,
            } => {
                let mut candidates = NoteSet::new();
                for attr in graph
                    .find_attributes(*kind, name)
                    .iter()
                    .filter_map(|id| graph.attribute(id))
                    .filter(|attr| comparator.matches(&attr.value))
                {
                    add_affected_notes(graph, attr, &mut candidates);
                }
                Ok(input.intersection(&candidates))
            }
            Self::RelationWhere { name, sub } => {
                let mut candidates = NoteSet::new();
                for attr in graph
                    .find_attributes(AttributeType::Relation, name)
                    .iter()
                    .filter_map(|id| graph.attribute(id))
                {
                    let Some(target_id) = attr.target_note_id() else {
                        continue;
                    };
                    if graph.note(target_id).is_none() {
                        continue;
                    }
                    let target = NoteSet::from_ids([target_id]);
                    if sub.execute(&target, context)?.has(target_id) {
                        add_affected_notes(graph, attr, &mut candidates);
                    }
                }
                Ok(input.intersection(&candidates))
            }
            Self::DescendantOf(sub) => {
                let matching = sub.execute(&context.all_notes(), context)?;
                let mut subtree = NoteSet::new();
                for note_id in &matching {
                    for id in graph.subtree_notes(note_id) {
                        subtree.add(id);
                    }
                }
                Ok(input.intersection(&subtree))
            }
            Self::ChildOf(sub) => {
                let related = |note: &Note| note.parents().to_vec();
                filter_by_related(input, context, sub, related)
            }
            Self::ParentOf(sub) => {
                let related = |note: &Note| note.children().to_vec();
                filter_by_related(input, context, sub, related)
            }
            Self::PropertyComparison {
                property,
                comparator,
            } => {
                if property.is_boolean()
                    && !matches!(
                        comparator.operator(),
                        ComparisonOperator::Equal | ComparisonOperator::NotEqual
                    )
                {
                    return Err(EvaluationError::UnsupportedBooleanOperator {
                        property: *property,
                        operator: comparator.operator(),
                    });
                }
                Ok(filter(input, |note_id| {
                    graph
                        .note(note_id)
                        .and_then(|note| property.value(graph, note))
                        .is_some_and(|value| comparator.matches(&value))
                }))
            }
            Self::OrderByAndLimit {
                inner,
                order,
                limit,
            } => {
                let mut result = inner.execute(input, context)?;
                if order.is_empty() {
                    return Ok(result);
                }
                result = sort_notes(graph, &result, order);
                if let Some(limit) = limit {
                    result.truncate(*limit);
                }
                Ok(result)
            }
        }
    }

    /// Limit the orchestrator applies after its default ordering.
    ///
    /// Only set when the query limits without an explicit ordering.
    pub fn unordered_limit(&self) -> Option<usize> {
        match self {
            Self::OrderByAndLimit { order, limit, .. } if order.is_empty() => *limit,
            _ => None,
        }
    }
}

fn ensure_content_operator(operator: ComparisonOperator) -> Result<(), EvaluationError> {
    if operator == ComparisonOperator::Contains {
        Ok(())
    } else {
        Err(EvaluationError::UnsupportedContentOperator(operator))
    }
}

fn filter(input: &NoteSet, mut keep: impl FnMut(&str) -> bool) -> NoteSet {
    NoteSet::from_ids(input.iter().filter(|id| keep(id)).cloned())
}

/// Adds every note an attribute applies to: the owner's subtree for
/// inheritable attributes, plus every note reaching them through templates.
fn add_affected_notes(graph: &GraphCache, attr: &Attribute, candidates: &mut NoteSet) {
    let owner = attr.note_id.as_str();
    let affected = if attr.is_inheritable {
        graph.subtree_notes_including_templated(owner)
    } else {
        graph.templated_notes(owner)
    };
    for id in affected {
        candidates.add(id);
    }
}

/// Keeps input notes having at least one related note matching `sub`.
fn filter_by_related(
    input: &NoteSet,
    context: &SearchContext<'_>,
    sub: &Expression,
    related: impl Fn(&Note) -> Vec<NoteId>,
) -> Result<NoteSet, EvaluationError> {
    let graph = context.graph;
    let mut pool = NoteSet::new();
    for note in input.iter().filter_map(|id| graph.note(id)) {
        for id in related(note) {
            pool.add(id);
        }
    }
    let matching = sub.execute(&pool, context)?;

    Ok(filter(input, |note_id| {
        graph
            .note(note_id)
            .is_some_and(|note| related(note).iter().any(|id| matching.has(id)))
    }))
}

fn scan_content(input: &NoteSet, context: &SearchContext<'_>, tokens: &[String]) -> NoteSet {
    let Some(provider) = context.content_provider else {
        return NoteSet::new();
    };
    filter(input, |note_id| {
        let Some(note) = context.graph.note(note_id) else {
            return false;
        };
        if note.is_protected || !is_scannable_type(&note.note_type) {
            return false;
        }
        provider.content(note_id).is_some_and(|content| {
            let content = searchable_content(&note.note_type, &note.mime, &content);
            tokens.iter().all(|token| content.contains(token.as_str()))
        })
    })
}

fn scan_protected_content(
    input: &NoteSet,
    context: &SearchContext<'_>,
    tokens: &[String],
) -> NoteSet {
    let Some(decryptor) = context.decryptor.filter(|decryptor| decryptor.is_available()) else {
        return NoteSet::new();
    };
    filter(input, |note_id| {
        let Some(note) = context.graph.note(note_id) else {
            return false;
        };
        if !note.is_protected || !is_scannable_type(&note.note_type) {
            return false;
        }
        let content = match decryptor.decrypt(note_id) {
            Ok(content) => content,
            Err(err) => {
                info!("event=decrypt_skip module=search status=skipped note_id={note_id} error={err}");
                return false;
            }
        };
        let content = searchable_content(&note.note_type, &note.mime, &content);
        tokens.iter().all(|token| content.contains(token.as_str()))
    })
}

fn sort_notes(graph: &GraphCache, notes: &NoteSet, order: &[OrderDefinition]) -> NoteSet {
    let mut keyed: Vec<(Vec<Option<String>>, &NoteId)> = notes
        .iter()
        .map(|note_id| {
            let values = match graph.note(note_id) {
                Some(note) => order.iter().map(|def| def.value(graph, note)).collect(),
                None => vec![None; order.len()],
            };
            (values, note_id)
        })
        .collect();

    keyed.sort_by(|(left, _), (right, _)| {
        for (def, (left, right)) in order.iter().zip(left.iter().zip(right.iter())) {
            let ordering = compare_values(left.as_deref(), right.as_deref());
            let ordering = match def.direction {
                OrderDirection::Ascending => ordering,
                OrderDirection::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });

    let mut sorted = NoteSet::from_ids(keyed.into_iter().map(|(_, id)| id.clone()));
    sorted.sorted = true;
    sorted
}

/// Missing values sort first; numbers compare numerically.
fn compare_values(left: Option<&str>, right: Option<&str>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(left), Some(right)) => match (parse_number(left), parse_number(right)) {
            (Some(left), Some(right)) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
            _ => left.to_lowercase().cmp(&right.to_lowercase()),
        },
    }
}
