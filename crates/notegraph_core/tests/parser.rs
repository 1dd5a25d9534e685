use notegraph_core::search::comparator::{Comparator, ComparisonOperator};
use notegraph_core::search::expression::{
    Expression, NoteProperty, OrderDefinition, OrderDirection, OrderKey,
};
use notegraph_core::search::lexer::lex;
use notegraph_core::search::parens::structure;
use notegraph_core::search::parser::parse;
use notegraph_core::{parse_query_to_expression, AttributeType, ParseError, ParsingContext};

fn parse_plain(query: &str) -> (Option<Expression>, ParsingContext) {
    let mut context = ParsingContext::new(false, false);
    let expression = parse_query_to_expression(query, &mut context);
    (expression, context)
}

fn exists(name: &str) -> Expression {
    Expression::AttributeExists {
        kind: AttributeType::Label,
        name: name.to_string(),
        prefix_match: false,
    }
}

fn compare(kind: AttributeType, name: &str, operator: &str, value: &str) -> Expression {
    Expression::AttributeCompare {
        kind,
        name: name.to_string(),
        comparator: Comparator::build(operator, value).unwrap(),
    }
}

#[test]
fn fulltext_and_attribute_are_joined_by_and() {
    let (expression, context) = parse_plain("hello #a");
    assert_eq!(
        expression.unwrap(),
        Expression::And(vec![
            Expression::Fulltext {
                tokens: vec!["hello".to_string()]
            },
            exists("a"),
        ])
    );
    assert!(context.error.is_none());
}

#[test]
fn fulltext_scans_content_when_enabled() {
    let mut context = ParsingContext::new(true, false);
    let expression = parse_query_to_expression("foo", &mut context).unwrap();
    let tokens = vec!["foo".to_string()];
    assert_eq!(
        expression,
        Expression::Or(vec![
            Expression::Fulltext {
                tokens: tokens.clone()
            },
            Expression::NoteContent {
                operator: ComparisonOperator::Contains,
                tokens: tokens.clone(),
            },
            Expression::ProtectedContent {
                operator: ComparisonOperator::Contains,
                tokens,
            },
        ])
    );
}

#[test]
fn label_comparison() {
    let (expression, _) = parse_plain("#label=text");
    assert_eq!(
        expression.unwrap(),
        compare(AttributeType::Label, "label", "=", "text")
    );
}

#[test]
fn relation_comparison_compares_target_id() {
    let (expression, _) = parse_plain("~country = austria");
    assert_eq!(
        expression.unwrap(),
        compare(AttributeType::Relation, "country", "=", "austria")
    );
}

#[test]
fn and_binds_tighter_than_or() {
    let (expression, _) = parse_plain("#a or #b and #c");
    assert_eq!(
        expression.unwrap(),
        Expression::Or(vec![
            exists("a"),
            Expression::And(vec![exists("b"), exists("c")]),
        ])
    );
}

#[test]
fn parentheses_group_sub_expressions() {
    let (expression, _) = parse_plain("# (#a or #b) #c");
    assert_eq!(
        expression.unwrap(),
        Expression::And(vec![
            Expression::Or(vec![exists("a"), exists("b")]),
            exists("c"),
        ])
    );
}

#[test]
fn negation_forms() {
    let (marker, _) = parse_plain("#!capital");
    assert_eq!(marker.unwrap(), Expression::Not(Box::new(exists("capital"))));

    let (keyword, _) = parse_plain("# not(#capital)");
    assert_eq!(keyword.unwrap(), Expression::Not(Box::new(exists("capital"))));
}

#[test]
fn bare_markers_only_switch_modes() {
    for query in ["# #a", "~ #a", "# ~ #a"] {
        let (expression, context) = parse_plain(query);
        assert_eq!(context.error, None, "`{query}`");
        assert_eq!(expression.unwrap(), exists("a"), "`{query}`");
    }
}

#[test]
fn not_requires_parenthesized_group() {
    let (expression, context) = parse_plain("# not #a");
    assert_eq!(
        context.error,
        Some(ParseError::NotWithoutGroup {
            found: Some("#a".to_string())
        })
    );
    assert_eq!(expression.unwrap(), exists("a"));
}

#[test]
fn negated_group_with_property_comparison() {
    let (expression, context) = parse_plain("# not(#capital) and note.noteId != 'root'");
    assert!(context.error.is_none());
    assert_eq!(
        expression.unwrap(),
        Expression::And(vec![
            Expression::Not(Box::new(exists("capital"))),
            Expression::PropertyComparison {
                property: NoteProperty::NoteId,
                comparator: Comparator::build("!=", "root").unwrap(),
            },
        ])
    );
}

#[test]
fn relation_path_navigation() {
    let (expression, _) = parse_plain("~author.title = 'Hugh Howey'");
    assert_eq!(
        expression.unwrap(),
        Expression::RelationWhere {
            name: "author".to_string(),
            sub: Box::new(Expression::PropertyComparison {
                property: NoteProperty::Title,
                comparator: Comparator::build("=", "hugh howey").unwrap(),
            }),
        }
    );
}

#[test]
fn nested_relation_paths() {
    let (expression, _) = parse_plain("~author.relations.publisher.#country=uk");
    assert_eq!(
        expression.unwrap(),
        Expression::RelationWhere {
            name: "author".to_string(),
            sub: Box::new(Expression::RelationWhere {
                name: "publisher".to_string(),
                sub: Box::new(compare(AttributeType::Label, "country", "=", "uk")),
            }),
        }
    );
}

#[test]
fn unknown_note_path_segment_is_a_label_name() {
    let (expression, _) = parse_plain("# note.'book title' = 'Silo'");
    assert_eq!(
        expression.unwrap(),
        compare(AttributeType::Label, "book title", "=", "silo")
    );
}

#[test]
fn hierarchy_paths() {
    let title_is = |value: &str| Expression::PropertyComparison {
        property: NoteProperty::Title,
        comparator: Comparator::build("=", value).unwrap(),
    };

    let (parents, _) = parse_plain("# note.parents.title = europe");
    assert_eq!(parents.unwrap(), Expression::ChildOf(Box::new(title_is("europe"))));

    let (children, _) = parse_plain("# note.children.title = vienna");
    assert_eq!(children.unwrap(), Expression::ParentOf(Box::new(title_is("vienna"))));

    let (ancestors, _) = parse_plain("# note.ancestors.title = europe");
    assert_eq!(
        ancestors.unwrap(),
        Expression::DescendantOf(Box::new(title_is("europe")))
    );
}

#[test]
fn content_path_builds_content_scans() {
    let (expression, _) = parse_plain("# note.content *=* rust");
    let tokens = vec!["rust".to_string()];
    assert_eq!(
        expression.unwrap(),
        Expression::Or(vec![
            Expression::NoteContent {
                operator: ComparisonOperator::Contains,
                tokens: tokens.clone(),
            },
            Expression::ProtectedContent {
                operator: ComparisonOperator::Contains,
                tokens,
            },
        ])
    );
}

#[test]
fn ordering_and_limit_wrap_the_query() {
    let (expression, context) = parse_plain("#a orderby note.title desc population limit 5");
    assert!(context.error.is_none());
    assert_eq!(
        expression.unwrap(),
        Expression::OrderByAndLimit {
            inner: Box::new(exists("a")),
            order: vec![
                OrderDefinition {
                    key: OrderKey::Property(NoteProperty::Title),
                    direction: OrderDirection::Descending,
                },
                OrderDefinition {
                    key: OrderKey::Label("population".to_string()),
                    direction: OrderDirection::Ascending,
                },
            ],
            limit: Some(5),
        }
    );
}

#[test]
fn ordering_inside_group_is_rejected() {
    let (_, context) = parse_plain("# (#a orderby title)");
    assert_eq!(
        context.error,
        Some(ParseError::MisplacedOrdering("orderby".to_string()))
    );
}

#[test]
fn diagnostics_for_malformed_queries() {
    let cases = [
        ("# note.", ParseError::DanglingDot),
        (
            "#a =*",
            ParseError::MissingValue {
                operator: "=*".to_string(),
            },
        ),
        ("#a => b", ParseError::UnknownOperator("=>".to_string())),
        ("#a limit x", ParseError::InvalidLimit("x".to_string())),
        ("# = b", ParseError::MisplacedOperator("=".to_string())),
        ("# foo", ParseError::UnrecognizedExpression("foo".to_string())),
        (
            "# note title",
            ParseError::ExpectedDot {
                found: Some("title".to_string()),
            },
        ),
        ("#!", ParseError::EmptyAttributeName("#!".to_string())),
        (
            "# (#a",
            ParseError::UnbalancedParenthesis {
                unclosed: 1,
                stray: 0,
            },
        ),
    ];

    for (query, expected) in cases {
        let (_, context) = parse_plain(query);
        assert_eq!(context.error, Some(expected), "query {query:?}");
    }
}

#[test]
fn invalid_regex_is_reported() {
    let (expression, context) = parse_plain("#a %= '[a-z'");
    assert!(expression.is_none());
    assert!(matches!(context.error, Some(ParseError::InvalidRegex { .. })));
}

#[test]
fn first_error_wins_and_parsing_continues() {
    let (expression, context) = parse_plain("# foo #a bar");
    assert_eq!(
        context.error,
        Some(ParseError::UnrecognizedExpression("foo".to_string()))
    );
    assert_eq!(expression.unwrap(), exists("a"));
}

#[test]
fn fuzzy_mode_relaxes_attribute_matching() {
    let mut context = ParsingContext::new(false, true);
    let expression = parse_query_to_expression("#cap", &mut context).unwrap();
    assert_eq!(
        expression,
        Expression::AttributeExists {
            kind: AttributeType::Label,
            name: "cap".to_string(),
            prefix_match: true,
        }
    );

    let expression = parse_query_to_expression("#capital=vie", &mut context).unwrap();
    assert_eq!(
        expression,
        compare(AttributeType::Label, "capital", "*=*", "vie")
    );
}

#[test]
fn highlighted_tokens_collect_words_names_and_values() {
    let (_, context) = parse_plain("hello #capital=vienna");
    assert_eq!(
        context.highlighted_tokens,
        vec!["hello".to_string(), "capital".to_string(), "vienna".to_string()]
    );
    assert_eq!(context.original_query, "hello #capital=vienna");
}

#[test]
fn parse_accepts_pre_structured_tokens() {
    let lexed = lex("world #a");
    let tree = structure(lexed.expression_tokens);
    let mut context = ParsingContext::default();
    let expression = parse(&lexed.fulltext_tokens, &tree, &mut context).unwrap();
    assert_eq!(
        expression,
        Expression::And(vec![
            Expression::Fulltext {
                tokens: vec!["world".to_string()]
            },
            exists("a"),
        ])
    );
}

#[test]
fn blank_query_parses_to_nothing() {
    let (expression, context) = parse_plain("   ");
    assert!(expression.is_none());
    assert!(context.error.is_none());
}
