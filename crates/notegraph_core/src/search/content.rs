//! Note content collaborators used by content and protected-content scans.
//!
//! # Responsibility
//! - Define how the engine reads note bodies it does not store itself.
//! - Normalize HTML bodies into plain searchable text.
//!
//! # Invariants
//! - The cache never holds note content; bodies are fetched per scan.
//! - A per-note decryption failure never aborts a query.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid html tag regex"));

/// Supplies bodies of unprotected notes.
pub trait NoteContentProvider {
    /// Raw body of `note_id`; `None` when the note has no stored content.
    fn content(&self, note_id: &str) -> Option<String>;
}

/// Failure to decrypt one protected note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionError {
    pub note_id: String,
    pub message: String,
}

impl DecryptionError {
    pub fn new(note_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            message: message.into(),
        }
    }
}

impl Display for DecryptionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot decrypt note {}: {}", self.note_id, self.message)
    }
}

impl Error for DecryptionError {}

/// Protected-session access to encrypted note bodies.
pub trait ContentDecryptor {
    /// Whether a protected session is currently open.
    fn is_available(&self) -> bool;

    /// Decrypted body of protected note `note_id`.
    ///
    /// # Errors
    /// - `DecryptionError` when this note's body cannot be decrypted.
    fn decrypt(&self, note_id: &str) -> Result<String, DecryptionError>;
}

/// Lowercases `content`, stripping markup for HTML text notes.
pub fn searchable_content(note_type: &str, mime: &str, content: &str) -> String {
    let content = content.to_lowercase();
    if note_type == "text" && mime == "text/html" {
        strip_html(&content)
    } else {
        content
    }
}

/// Removes HTML tags and `&nbsp;` entities.
pub fn strip_html(content: &str) -> String {
    HTML_TAG_RE.replace_all(content, "").replace("&nbsp;", " ")
}

/// Only text and code notes carry scannable bodies.
pub(crate) fn is_scannable_type(note_type: &str) -> bool {
    matches!(note_type, "text" | "code")
}

#[cfg(test)]
mod tests {
    use super::{searchable_content, strip_html};

    #[test]
    fn strip_html_removes_tags_and_nbsp() {
        assert_eq!(strip_html("<p>hello&nbsp;<b>world</b></p>"), "hello world");
    }

    #[test]
    fn only_html_text_notes_are_stripped() {
        assert_eq!(searchable_content("text", "text/html", "<i>Hi</i>"), "hi");
        assert_eq!(
            searchable_content("code", "text/html", "<i>Hi</i>"),
            "<i>hi</i>"
        );
    }
}
