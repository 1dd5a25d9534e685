//! Query lexer: splits raw input into fulltext and expression tokens.
//!
//! # Invariants
//! - Total: every input produces a result, malformed input degrades to
//!   best-effort tokens.
//! - Once a `#`/`~` marker appears at a token boundary, every later token is
//!   an expression token.
//! - Token text is lowercase; `start_index`/`end_index` are inclusive
//!   character positions in the original query.

/// One lexed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// Quoted tokens are always literal values.
    pub in_quotes: bool,
    pub start_index: usize,
    pub end_index: usize,
}

impl Token {
    /// Characters of `query` covered by this token (original case).
    pub fn source_slice(&self, query: &str) -> String {
        if self.end_index < self.start_index {
            return String::new();
        }
        query
            .chars()
            .skip(self.start_index)
            .take(self.end_index - self.start_index + 1)
            .collect()
    }
}

/// Output of [`lex`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LexResult {
    pub fulltext_tokens: Vec<Token>,
    pub expression_tokens: Vec<Token>,
}

const QUOTE_CHARS: [char; 3] = ['\'', '"', '`'];
const STRUCTURAL_CHARS: [char; 3] = ['(', ')', '.'];
const OPERATOR_CHARS: [char; 6] = ['=', '*', '!', '<', '>', '%'];

/// Whether `chr` can be part of a comparison operator.
pub fn is_operator_char(chr: char) -> bool {
    OPERATOR_CHARS.contains(&chr)
}

/// Lexes `query` into fulltext and expression token streams.
pub fn lex(query: &str) -> LexResult {
    let chars: Vec<char> = query.chars().collect();
    let mut lexer = Lexer::default();
    let mut i = 0;

    while i < chars.len() {
        let chr = chars[i];

        if let Some(quote) = lexer.quote {
            if chr == '\\' && i + 1 < chars.len() {
                lexer.push(chars[i + 1], i + 1);
                i += 2;
                continue;
            }
            if chr == quote {
                lexer.finish_quoted(i);
            } else {
                lexer.push(chr, i);
            }
            i += 1;
            continue;
        }

        if chr == '\\' {
            if i + 1 < chars.len() {
                lexer.push_literal(chars[i + 1], i, i + 1);
                i += 2;
            } else {
                lexer.push_literal(chr, i, i);
                i += 1;
            }
            continue;
        }

        if QUOTE_CHARS.contains(&chr) {
            if lexer.at_quote_boundary() {
                lexer.finish_word();
                lexer.open_quote(chr, i);
            } else {
                lexer.push_plain(chr, i);
            }
        } else if chr.is_whitespace() {
            lexer.finish_word();
        } else if chr == '#' || chr == '~' {
            lexer.marker(chr, i);
        } else if lexer.expression_mode && STRUCTURAL_CHARS.contains(&chr) {
            lexer.finish_word();
            lexer.push_plain(chr, i);
            lexer.finish_word();
        } else if lexer.expression_mode && is_operator_char(chr) {
            lexer.push_operator(chr, i);
        } else {
            lexer.push_plain(chr, i);
        }
        i += 1;
    }

    if lexer.quote.is_some() {
        lexer.finish_quoted(chars.len());
    }
    lexer.finish_word();

    LexResult {
        fulltext_tokens: lexer.fulltext,
        expression_tokens: lexer.expression,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum WordKind {
    #[default]
    Plain,
    Operator,
}

#[derive(Debug, Default)]
struct Lexer {
    fulltext: Vec<Token>,
    expression: Vec<Token>,
    expression_mode: bool,
    word: String,
    kind: WordKind,
    start: usize,
    end: usize,
    quote: Option<char>,
}

impl Lexer {
    fn at_quote_boundary(&self) -> bool {
        self.word.is_empty() || (self.expression_mode && self.kind == WordKind::Operator)
    }

    fn open_quote(&mut self, quote: char, index: usize) {
        self.quote = Some(quote);
        self.start = index + 1;
        self.end = index;
    }

    fn push(&mut self, chr: char, index: usize) {
        if self.word.is_empty() && self.quote.is_none() {
            self.start = index;
        }
        self.word.extend(chr.to_lowercase());
        self.end = index;
    }

    fn push_plain(&mut self, chr: char, index: usize) {
        if self.kind == WordKind::Operator {
            self.finish_word();
        }
        self.push(chr, index);
    }

    /// Escaped character: literal text starting at the backslash.
    fn push_literal(&mut self, chr: char, backslash_index: usize, index: usize) {
        if self.kind == WordKind::Operator {
            self.finish_word();
        }
        if self.word.is_empty() {
            self.start = backslash_index;
        }
        self.word.extend(chr.to_lowercase());
        self.end = index;
    }

    fn push_operator(&mut self, chr: char, index: usize) {
        // `#!name` / `~!name` negation stays glued to the marker.
        if chr == '!' && (self.word == "#" || self.word == "~") {
            self.push(chr, index);
            return;
        }
        if self.kind != WordKind::Operator {
            self.finish_word();
            self.kind = WordKind::Operator;
        }
        self.push(chr, index);
    }

    fn marker(&mut self, chr: char, index: usize) {
        if self.expression_mode {
            self.finish_word();
        } else if self.word.is_empty() {
            self.expression_mode = true;
        } else {
            // Mid-word markers are ordinary fulltext characters.
            self.push(chr, index);
            return;
        }
        self.push(chr, index);
    }

    fn finish_word(&mut self) {
        if !self.word.is_empty() {
            let token = Token {
                text: std::mem::take(&mut self.word),
                in_quotes: false,
                start_index: self.start,
                end_index: self.end,
            };
            self.emit(token);
        }
        self.kind = WordKind::Plain;
    }

    /// Closes a quoted region; `close_index` is the closing quote position.
    fn finish_quoted(&mut self, close_index: usize) {
        let token = Token {
            text: std::mem::take(&mut self.word),
            in_quotes: true,
            start_index: self.start,
            end_index: close_index.saturating_sub(1),
        };
        self.quote = None;
        self.kind = WordKind::Plain;
        self.emit(token);
    }

    fn emit(&mut self, token: Token) {
        if self.expression_mode {
            self.expression.push(token);
        } else {
            self.fulltext.push(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{is_operator_char, lex};

    #[test]
    fn operator_chars_cover_all_comparison_symbols() {
        for chr in ['=', '*', '!', '<', '>', '%'] {
            assert!(is_operator_char(chr));
        }
        assert!(!is_operator_char('.'));
    }

    #[test]
    fn whitespace_only_input_yields_no_tokens() {
        let result = lex(" \t \n");
        assert!(result.fulltext_tokens.is_empty());
        assert!(result.expression_tokens.is_empty());
    }

    #[test]
    fn lexing_is_case_insensitive_inside_quotes() {
        let result = lex("'Hello World'");
        assert_eq!(result.fulltext_tokens[0].text, "hello world");
        assert!(result.fulltext_tokens[0].in_quotes);
    }
}
