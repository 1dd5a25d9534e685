//! Autocomplete highlighting of result titles.
//!
//! Matches are first wrapped in `{`/`}` placeholders and rendered as
//! `<b>`/`</b>` at the end, so later tokens never match inside inserted tags.
//! Tokens are matched only in text between markup: inserted `<small>` tags
//! and escaped entities such as `&amp;` are left intact.

use super::service::SearchResult;
use crate::cache::GraphCache;
use crate::model::attribute::{Attribute, AttributeType};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

static MARKUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>|&#?\w+;").expect("valid markup regex"));

static NON_WORD_VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w-]").expect("valid non-word value regex"));

/// Fills `highlighted_note_path_title` of every result.
pub(crate) fn highlight_results(graph: &GraphCache, results: &mut [SearchResult], tokens: &[String]) {
    let tokens = prepare_tokens(tokens);

    for result in results.iter_mut() {
        let mut title = result.note_path_title.clone();
        for attr in graph
            .attributes(result.note_id())
            .iter()
            .filter_map(|attribute_id| graph.attribute(attribute_id))
        {
            let value = attr.value.to_lowercase();
            if tokens
                .iter()
                .any(|token| attr.name.contains(token.as_str()) || value.contains(token.as_str()))
            {
                title.push_str(" <small>");
                title.push_str(&format_attribute(attr));
                title.push_str("</small>");
            }
        }
        result.highlighted_note_path_title = Some(title);
    }

    for token in &tokens {
        let Ok(regex) = RegexBuilder::new(&format!("({})", regex::escape(token)))
            .case_insensitive(true)
            .build()
        else {
            continue;
        };
        for result in results.iter_mut() {
            if let Some(title) = result.highlighted_note_path_title.as_mut() {
                *title = wrap_outside_markup(title, &regex);
            }
        }
    }

    for result in results.iter_mut() {
        if let Some(title) = result.highlighted_note_path_title.as_mut() {
            *title = title.replace('{', "<b>").replace('}', "</b>");
        }
    }
}

/// Wraps every match of `regex` in `{`/`}`, skipping tags and entities.
fn wrap_outside_markup(title: &str, regex: &Regex) -> String {
    let mut wrapped = String::with_capacity(title.len());
    let mut last = 0;
    for markup in MARKUP_RE.find_iter(title) {
        wrapped.push_str(&regex.replace_all(&title[last..markup.start()], "{$1}"));
        wrapped.push_str(markup.as_str());
        last = markup.end();
    }
    wrapped.push_str(&regex.replace_all(&title[last..], "{$1}"));
    wrapped
}

/// Strips `<`, `{`, `}` and orders tokens longest first.
fn prepare_tokens(tokens: &[String]) -> Vec<String> {
    let mut prepared: Vec<String> = tokens
        .iter()
        .map(|token| token.replace(['<', '{', '}'], ""))
        .filter(|token| !token.is_empty())
        .collect();
    prepared.sort_by(|left, right| {
        right
            .chars()
            .count()
            .cmp(&left.chars().count())
            .then_with(|| left.cmp(right))
    });
    prepared.dedup();
    prepared
}

fn format_attribute(attr: &Attribute) -> String {
    match attr.kind {
        AttributeType::Relation => format!("@{}=…", escape_html(&attr.name)),
        AttributeType::Label => {
            let mut label = format!("#{}", escape_html(&attr.name));
            if !attr.value.is_empty() {
                let value = if NON_WORD_VALUE_RE.is_match(&attr.value) {
                    format!("\"{}\"", attr.value)
                } else {
                    attr.value.clone()
                };
                label.push('=');
                label.push_str(&escape_html(&value));
            }
            label
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for chr in text.chars() {
        match chr {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(chr),
        }
    }
    escaped
}
