//! Query parser: lexed tokens to an [`Expression`] tree.
//!
//! # Responsibility
//! - Map fulltext tokens and the structured expression tokens onto
//!   expression variants.
//! - Record diagnostics in the parsing context and keep going.
//!
//! # Invariants
//! - `and` binds tighter than `or`; adjacent expressions are joined by `and`.
//! - Ordering clauses (`orderby`, `limit`) are accepted at the top level only.
//! - Keywords are recognized only in unquoted tokens.
//! - A bare `#` or `~` only switches the lexer to expression mode and is
//!   skipped here.
//! - Descendant scoping is written `note.ancestors.<path>`, e.g.
//!   `note.ancestors.title = europe`.
//!
//! # See also
//! - `search::lexer` and `search::parens` for the input shape.

use super::comparator::{is_operator_token, Comparator, ComparisonOperator};
use super::context::{ParseError, ParsingContext};
use super::expression::{Expression, NoteProperty, OrderDefinition, OrderDirection, OrderKey};
use super::lexer::{lex, Token};
use super::parens::{structure_reporting, TokenTree};
use crate::model::attribute::AttributeType;

/// Lexes, structures and parses `query`.
///
/// Returns `None` for queries without any usable expression; diagnostics are
/// left in `context.error`.
pub fn parse_query_to_expression(query: &str, context: &mut ParsingContext) -> Option<Expression> {
    context.original_query = query.to_string();
    let lexed = lex(query);
    let tree = structure_reporting(lexed.expression_tokens, context);
    parse(&lexed.fulltext_tokens, &tree, context)
}

/// Builds the expression for already lexed and structured tokens.
pub fn parse(
    fulltext_tokens: &[Token],
    expression_tree: &[TokenTree],
    context: &mut ParsingContext,
) -> Option<Expression> {
    let fulltext = parse_fulltext(fulltext_tokens, context);

    let split = expression_tree
        .iter()
        .position(|tree| matches!(keyword(Some(tree)), Some("orderby" | "limit")))
        .unwrap_or(expression_tree.len());
    let (predicates, ordering) = expression_tree.split_at(split);

    let structured = parse_sequence(predicates, context);
    let (order, limit) = parse_ordering(ordering, context);

    let expression = combine(fulltext.into_iter().chain(structured).collect(), Expression::And)?;
    if order.is_empty() && limit.is_none() {
        return Some(expression);
    }
    Some(Expression::OrderByAndLimit {
        inner: Box::new(expression),
        order,
        limit,
    })
}

fn parse_fulltext(tokens: &[Token], context: &mut ParsingContext) -> Option<Expression> {
    if tokens.is_empty() {
        return None;
    }
    let texts: Vec<String> = tokens.iter().map(|token| token.text.clone()).collect();
    for text in &texts {
        context.highlight(text);
    }

    let fulltext = Expression::Fulltext {
        tokens: texts.clone(),
    };
    if !context.include_note_content {
        return Some(fulltext);
    }
    Some(Expression::Or(vec![
        fulltext,
        Expression::NoteContent {
            operator: ComparisonOperator::Contains,
            tokens: texts.clone(),
        },
        Expression::ProtectedContent {
            operator: ComparisonOperator::Contains,
            tokens: texts,
        },
    ]))
}

struct Cursor<'t> {
    trees: &'t [TokenTree],
    pos: usize,
}

impl<'t> Cursor<'t> {
    fn new(trees: &'t [TokenTree]) -> Self {
        Self { trees, pos: 0 }
    }

    fn peek(&self) -> Option<&'t TokenTree> {
        self.trees.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t TokenTree> {
        let tree = self.trees.get(self.pos);
        if tree.is_some() {
            self.pos += 1;
        }
        tree
    }

    fn peek_keyword(&self) -> Option<&'t str> {
        keyword(self.peek())
    }

    /// Consumes the next token when it is an unquoted operator.
    fn next_operator(&mut self) -> Option<&'t str> {
        let operator = self.peek_keyword().filter(|text| is_operator_token(text))?;
        self.pos += 1;
        Some(operator)
    }

    /// Consumes an unquoted `.`; records an error otherwise.
    fn expect_dot(&mut self, context: &mut ParsingContext) -> bool {
        if self.peek_keyword() == Some(".") {
            self.pos += 1;
            return true;
        }
        context.add_error(ParseError::ExpectedDot {
            found: self.peek().map(describe),
        });
        false
    }
}

/// Text of an unquoted token.
fn keyword(tree: Option<&TokenTree>) -> Option<&str> {
    tree.and_then(TokenTree::as_token)
        .filter(|token| !token.in_quotes)
        .map(|token| token.text.as_str())
}

fn describe(tree: &TokenTree) -> String {
    match tree {
        TokenTree::Token(token) => token.text.clone(),
        TokenTree::Group(_) => "(".to_string(),
    }
}

fn combine(
    mut expressions: Vec<Expression>,
    wrap: fn(Vec<Expression>) -> Expression,
) -> Option<Expression> {
    match expressions.len() {
        0 => None,
        1 => expressions.pop(),
        _ => Some(wrap(expressions)),
    }
}

/// Parses a token sequence (top level or a parenthesized group).
fn parse_sequence(trees: &[TokenTree], context: &mut ParsingContext) -> Option<Expression> {
    let mut cursor = Cursor::new(trees);
    let mut alternatives: Vec<Expression> = Vec::new();
    let mut conjunction: Vec<Expression> = Vec::new();

    while let Some(tree) = cursor.next() {
        let token = match tree {
            TokenTree::Group(group) => {
                conjunction.extend(parse_sequence(group, context));
                continue;
            }
            TokenTree::Token(token) => token,
        };

        if token.in_quotes {
            context.add_error(ParseError::UnrecognizedExpression(token.text.clone()));
            continue;
        }

        let text = token.text.as_str();
        match text {
            "and" | "#" | "~" => {}
            "or" => alternatives.extend(combine(std::mem::take(&mut conjunction), Expression::And)),
            "not" => match cursor.peek() {
                Some(TokenTree::Group(group)) => {
                    cursor.pos += 1;
                    if let Some(negated) = parse_sequence(group, context) {
                        conjunction.push(Expression::Not(Box::new(negated)));
                    }
                }
                other => context.add_error(ParseError::NotWithoutGroup {
                    found: other.map(describe),
                }),
            },
            "note" => {
                if cursor.expect_dot(context) {
                    conjunction.extend(parse_note_path(&mut cursor, context));
                }
            }
            "orderby" | "limit" => {
                context.add_error(ParseError::MisplacedOrdering(text.to_string()));
                break;
            }
            _ if text.starts_with('#') || text.starts_with('~') => {
                conjunction.extend(parse_attribute(text, &mut cursor, context));
            }
            _ if is_operator_token(text) => {
                context.add_error(ParseError::MisplacedOperator(text.to_string()));
            }
            _ => context.add_error(ParseError::UnrecognizedExpression(text.to_string())),
        }
    }

    alternatives.extend(combine(conjunction, Expression::And));
    combine(alternatives, Expression::Or)
}

/// Parses a `#name` / `#!name` / `~name` marker token and what follows it.
fn parse_attribute(
    marker_token: &str,
    cursor: &mut Cursor<'_>,
    context: &mut ParsingContext,
) -> Option<Expression> {
    let kind = if marker_token.starts_with('#') {
        AttributeType::Label
    } else {
        AttributeType::Relation
    };
    let rest = &marker_token[1..];
    let (negated, name) = match rest.strip_prefix('!') {
        Some(name) => (true, name),
        None => (false, rest),
    };
    if name.is_empty() {
        context.add_error(ParseError::EmptyAttributeName(marker_token.to_string()));
        return None;
    }

    let predicate = parse_attribute_predicate(kind, name, cursor, context)?;
    Some(if negated {
        Expression::Not(Box::new(predicate))
    } else {
        predicate
    })
}

/// Existence, comparison or relation navigation for a named attribute.
fn parse_attribute_predicate(
    kind: AttributeType,
    name: &str,
    cursor: &mut Cursor<'_>,
    context: &mut ParsingContext,
) -> Option<Expression> {
    context.highlight(name);

    if kind == AttributeType::Relation && cursor.peek_keyword() == Some(".") {
        cursor.pos += 1;
        let sub = parse_note_path(cursor, context)?;
        return Some(Expression::RelationWhere {
            name: name.to_string(),
            sub: Box::new(sub),
        });
    }

    if let Some(operator) = cursor.next_operator() {
        let operator = if context.fuzzy_attribute_search && operator == "=" {
            "*=*"
        } else {
            operator
        };
        let comparator = parse_comparison(operator, cursor, context)?;
        return Some(Expression::AttributeCompare {
            kind,
            name: name.to_string(),
            comparator,
        });
    }

    Some(Expression::AttributeExists {
        kind,
        name: name.to_string(),
        prefix_match: context.fuzzy_attribute_search,
    })
}

/// Reads the value after `operator` and builds the comparator.
fn parse_comparison(
    operator: &str,
    cursor: &mut Cursor<'_>,
    context: &mut ParsingContext,
) -> Option<Comparator> {
    let value = match cursor.peek().and_then(TokenTree::as_token) {
        Some(token) => {
            cursor.pos += 1;
            token.text.clone()
        }
        None => {
            context.add_error(ParseError::MissingValue {
                operator: operator.to_string(),
            });
            return None;
        }
    };
    context.highlight(&value);

    match Comparator::build(operator, &value) {
        Ok(comparator) => Some(comparator),
        Err(err) => {
            context.add_error(err.into());
            None
        }
    }
}

/// Parses the path after `note.` (or after `~relation.`).
fn parse_note_path(cursor: &mut Cursor<'_>, context: &mut ParsingContext) -> Option<Expression> {
    let token = match cursor.next() {
        Some(TokenTree::Token(token)) => token,
        Some(TokenTree::Group(_)) => {
            context.add_error(ParseError::UnrecognizedExpression("(".to_string()));
            return None;
        }
        None => {
            context.add_error(ParseError::DanglingDot);
            return None;
        }
    };
    let segment = token.text.as_str();

    if !token.in_quotes && (segment.starts_with('#') || segment.starts_with('~')) {
        return parse_attribute(segment, cursor, context);
    }
    if token.in_quotes {
        return parse_attribute_predicate(AttributeType::Label, segment, cursor, context);
    }

    match segment {
        "content" => {
            let Some(operator) = cursor.next_operator() else {
                context.add_error(ParseError::MissingValue {
                    operator: segment.to_string(),
                });
                return None;
            };
            let comparator = parse_comparison(operator, cursor, context)?;
            let tokens = vec![comparator.value().to_string()];
            Some(Expression::Or(vec![
                Expression::NoteContent {
                    operator: comparator.operator(),
                    tokens: tokens.clone(),
                },
                Expression::ProtectedContent {
                    operator: comparator.operator(),
                    tokens,
                },
            ]))
        }
        "parents" | "children" | "ancestors" => {
            if !cursor.expect_dot(context) {
                return None;
            }
            let sub = Box::new(parse_note_path(cursor, context)?);
            Some(match segment {
                "parents" => Expression::ChildOf(sub),
                "children" => Expression::ParentOf(sub),
                _ => Expression::DescendantOf(sub),
            })
        }
        "labels" | "relations" => {
            if !cursor.expect_dot(context) {
                return None;
            }
            let kind = if segment == "labels" {
                AttributeType::Label
            } else {
                AttributeType::Relation
            };
            match cursor.next() {
                Some(TokenTree::Token(name)) => {
                    parse_attribute_predicate(kind, &name.text, cursor, context)
                }
                Some(TokenTree::Group(_)) => {
                    context.add_error(ParseError::UnrecognizedExpression("(".to_string()));
                    None
                }
                None => {
                    context.add_error(ParseError::DanglingDot);
                    None
                }
            }
        }
        _ => match NoteProperty::parse(segment) {
            Some(property) => {
                let Some(operator) = cursor.next_operator() else {
                    context.add_error(ParseError::MissingValue {
                        operator: segment.to_string(),
                    });
                    return None;
                };
                let comparator = parse_comparison(operator, cursor, context)?;
                Some(Expression::PropertyComparison {
                    property,
                    comparator,
                })
            }
            None => parse_attribute_predicate(AttributeType::Label, segment, cursor, context),
        },
    }
}

/// Parses `orderby <key> [asc|desc] ... limit <n>` clauses.
fn parse_ordering(
    trees: &[TokenTree],
    context: &mut ParsingContext,
) -> (Vec<OrderDefinition>, Option<usize>) {
    let mut cursor = Cursor::new(trees);
    let mut order = Vec::new();
    let mut limit = None;
    let mut in_orderby = false;

    while let Some(tree) = cursor.next() {
        let Some(text) = keyword(Some(tree)) else {
            context.add_error(ParseError::UnrecognizedExpression(describe(tree)));
            continue;
        };

        match text {
            "orderby" => in_orderby = true,
            "limit" => {
                in_orderby = false;
                match cursor.next().and_then(TokenTree::as_token) {
                    Some(token) => match token.text.parse::<usize>() {
                        Ok(value) => limit = Some(value),
                        Err(_) => context.add_error(ParseError::InvalidLimit(token.text.clone())),
                    },
                    None => context.add_error(ParseError::InvalidLimit(String::new())),
                }
            }
            "," => {}
            _ if in_orderby => {
                let name = if text == "note" {
                    if !cursor.expect_dot(context) {
                        continue;
                    }
                    match keyword(cursor.next()) {
                        Some(name) => name,
                        None => {
                            context.add_error(ParseError::DanglingDot);
                            continue;
                        }
                    }
                } else {
                    text
                };

                let key = match NoteProperty::parse(name) {
                    Some(property) => OrderKey::Property(property),
                    None => OrderKey::Label(name.trim_start_matches('#').to_string()),
                };
                let direction = match cursor.peek_keyword() {
                    Some("desc") => {
                        cursor.pos += 1;
                        OrderDirection::Descending
                    }
                    Some("asc") => {
                        cursor.pos += 1;
                        OrderDirection::Ascending
                    }
                    _ => OrderDirection::Ascending,
                };
                order.push(OrderDefinition { key, direction });
            }
            _ => context.add_error(ParseError::UnrecognizedExpression(text.to_string())),
        }
    }

    (order, limit)
}
