use notegraph_core::search::lexer::{lex, Token};

fn texts(tokens: &[Token]) -> Vec<&str> {
    tokens.iter().map(|token| token.text.as_str()).collect()
}

fn token(text: &str, in_quotes: bool, start_index: usize, end_index: usize) -> Token {
    Token {
        text: text.to_string(),
        in_quotes,
        start_index,
        end_index,
    }
}

#[test]
fn fulltext_words_are_split_on_whitespace() {
    assert_eq!(texts(&lex("hello world").fulltext_tokens), ["hello", "world"]);
}

#[test]
fn quotes_keep_words_together() {
    for query in ["'hello world' my friend", "\"hello world\" my friend", "`hello world` my friend"] {
        assert_eq!(
            texts(&lex(query).fulltext_tokens),
            ["hello world", "my", "friend"]
        );
    }
}

#[test]
fn other_quotes_and_specials_are_literal_inside_quotes() {
    assert_eq!(
        texts(&lex("'i can use \" or ` or #~=*' without problem").fulltext_tokens),
        ["i can use \" or ` or #~=*", "without", "problem"]
    );
}

#[test]
fn quote_inside_a_word_is_ordinary_text() {
    let result = lex("d'Artagnan is dead #hero = d'Artagnan");
    assert_eq!(texts(&result.fulltext_tokens), ["d'artagnan", "is", "dead"]);
    assert_eq!(texts(&result.expression_tokens), ["#hero", "=", "d'artagnan"]);
}

#[test]
fn unterminated_quote_consumes_rest_of_input() {
    let result = lex("'unfinished quote");
    assert_eq!(texts(&result.fulltext_tokens), ["unfinished quote"]);
    assert!(result.fulltext_tokens[0].in_quotes);
}

#[test]
fn symbols_in_fulltext_are_ordinary_characters() {
    assert_eq!(
        texts(&lex("what's u=p <b(r*t)h>").fulltext_tokens),
        ["what's", "u=p", "<b(r*t)h>"]
    );
}

#[test]
fn escaped_specials_lose_their_meaning() {
    let result = lex("hello \\#\\~\\'");
    assert_eq!(texts(&result.fulltext_tokens), ["hello", "#~'"]);
    assert!(result.expression_tokens.is_empty());
}

#[test]
fn quoted_token_positions_cover_content_between_quotes() {
    let query = "'a b' c";
    let result = lex(query);
    let quoted = &result.fulltext_tokens[0];
    assert_eq!(quoted, &token("a b", true, 1, 3));
    assert_eq!(quoted.source_slice(query), "a b");
    assert_eq!(result.fulltext_tokens[1], token("c", false, 6, 6));
}

#[test]
fn attribute_markers_start_expression_tokens() {
    assert_eq!(
        texts(&lex("#label ~relation").expression_tokens),
        ["#label", "~relation"]
    );
}

#[test]
fn operators_are_split_from_names_and_values() {
    assert_eq!(
        lex("#label*=*'text'").expression_tokens,
        vec![
            token("#label", false, 0, 5),
            token("*=*", false, 6, 8),
            token("text", true, 10, 13),
        ]
    );
    assert_eq!(
        lex("#label*=*text").expression_tokens,
        vec![
            token("#label", false, 0, 5),
            token("*=*", false, 6, 8),
            token("text", false, 9, 12),
        ]
    );
}

#[test]
fn ordering_operators_are_single_tokens() {
    assert_eq!(
        texts(&lex("#year>=2000 #rank<3").expression_tokens),
        ["#year", ">=", "2000", "#rank", "<", "3"]
    );
}

#[test]
fn parentheses_and_keywords_are_lowercased_tokens() {
    assert_eq!(
        texts(&lex("# (#label=text OR #second=text) AND ~relation").expression_tokens),
        ["#", "(", "#label", "=", "text", "or", "#second", "=", "text", ")", "and", "~relation"]
    );
}

#[test]
fn dots_separate_property_paths() {
    assert_eq!(
        texts(&lex("# ~author.title = 'Hugh Howey' AND note.'book title' = 'Silo'").expression_tokens),
        ["#", "~author", ".", "title", "=", "hugh howey", "and", "note", ".", "book title", "=", "silo"]
    );
}

#[test]
fn negation_is_glued_to_marker() {
    assert_eq!(
        texts(&lex("#!capital ~!neighbor").expression_tokens),
        ["#!capital", "~!neighbor"]
    );
}

#[test]
fn negated_sub_expression_tokens() {
    assert_eq!(
        texts(&lex("# not(#capital) and note.noteId != \"root\"").expression_tokens),
        ["#", "not", "(", "#capital", ")", "and", "note", ".", "noteid", "!=", "root"]
    );
}

#[test]
fn concatenated_attributes_are_split() {
    assert_eq!(
        texts(&lex("#label~relation").expression_tokens),
        ["#label", "~relation"]
    );
}

#[test]
fn trailing_backslash_is_its_own_token() {
    assert_eq!(texts(&lex("abc \\").fulltext_tokens), ["abc", "\\"]);
}

#[test]
fn no_fulltext_tokens_after_mode_switch() {
    let result = lex("before #label after words here");
    assert_eq!(texts(&result.fulltext_tokens), ["before"]);
    assert_eq!(
        texts(&result.expression_tokens),
        ["#label", "after", "words", "here"]
    );
}

#[test]
fn marker_inside_a_word_does_not_switch_mode() {
    let result = lex("c# rocks");
    assert_eq!(texts(&result.fulltext_tokens), ["c#", "rocks"]);
    assert!(result.expression_tokens.is_empty());
}

#[test]
fn lexing_never_fails_and_yields_tokens_for_non_blank_input() {
    let queries = [
        "'", "\"", "\\", "#", "~!", "((", "))", "#a=", "= = =", "#a.'b", "`x", "#(", "~.",
        "note.", "\\'quoted\\'", "#a %= '[a-z'",
    ];
    for query in queries {
        let result = lex(query);
        assert!(
            result.fulltext_tokens.len() + result.expression_tokens.len() >= 1,
            "no tokens for {query:?}"
        );
    }
}
