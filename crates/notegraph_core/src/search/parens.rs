//! Parenthesis structuring of expression tokens.
//!
//! Keeps bracket matching out of the parser: `(` opens a nested group and
//! the matching `)` closes it. Quoted parentheses are ordinary values.

use super::context::{ParseError, ParsingContext};
use super::lexer::Token;

/// Token or parenthesized group of tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenTree {
    Token(Token),
    Group(Vec<TokenTree>),
}

impl TokenTree {
    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Self::Token(token) => Some(token),
            Self::Group(_) => None,
        }
    }

    /// Text of a plain token; `None` for groups.
    pub fn text(&self) -> Option<&str> {
        self.as_token().map(|token| token.text.as_str())
    }
}

/// Nests `tokens` by parentheses.
///
/// An unmatched `(` extends to the end of input; an unmatched `)` is dropped.
pub fn structure(tokens: Vec<Token>) -> Vec<TokenTree> {
    structure_counting(tokens).tree
}

/// Same as [`structure`], recording unbalanced parentheses in `context`.
pub fn structure_reporting(tokens: Vec<Token>, context: &mut ParsingContext) -> Vec<TokenTree> {
    let structured = structure_counting(tokens);
    if structured.unclosed > 0 || structured.stray > 0 {
        context.add_error(ParseError::UnbalancedParenthesis {
            unclosed: structured.unclosed,
            stray: structured.stray,
        });
    }
    structured.tree
}

struct Structured {
    tree: Vec<TokenTree>,
    unclosed: usize,
    stray: usize,
}

fn structure_counting(tokens: Vec<Token>) -> Structured {
    let mut current: Vec<TokenTree> = Vec::new();
    let mut parents: Vec<Vec<TokenTree>> = Vec::new();
    let mut stray = 0;

    for token in tokens {
        if !token.in_quotes && token.text == "(" {
            parents.push(std::mem::take(&mut current));
        } else if !token.in_quotes && token.text == ")" {
            match parents.pop() {
                Some(mut parent) => {
                    parent.push(TokenTree::Group(std::mem::take(&mut current)));
                    current = parent;
                }
                None => stray += 1,
            }
        } else {
            current.push(TokenTree::Token(token));
        }
    }

    let unclosed = parents.len();
    while let Some(mut parent) = parents.pop() {
        parent.push(TokenTree::Group(std::mem::take(&mut current)));
        current = parent;
    }

    Structured {
        tree: current,
        unclosed,
        stray,
    }
}
