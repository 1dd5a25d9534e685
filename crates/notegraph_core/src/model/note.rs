//! Note entity and its memoized derived views.
//!
//! # Invariants
//! - Edge lists hold ids only; `GraphCache` owns every entity.
//! - Memo cells are filled lazily by `GraphCache` and emptied only through
//!   `&mut` invalidation, so a reader never sees a half-invalidated note.

use super::{AttributeId, BranchId, NoteId};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Note row as materialized by the external loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRow {
    pub note_id: NoteId,
    pub title: String,
    #[serde(rename = "type", default = "default_note_type")]
    pub note_type: String,
    #[serde(default = "default_mime")]
    pub mime: String,
    #[serde(default)]
    pub is_protected: bool,
    /// For protected notes: whether the loader delivered a decrypted title.
    #[serde(default)]
    pub is_content_available: bool,
    #[serde(default)]
    pub content_length: Option<i64>,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub date_modified: Option<String>,
    #[serde(default)]
    pub utc_date_created: Option<String>,
    #[serde(default)]
    pub utc_date_modified: Option<String>,
}

fn default_note_type() -> String {
    "text".to_string()
}

fn default_mime() -> String {
    "text/html".to_string()
}

impl NoteRow {
    /// Builds an unprotected `text/html` note row.
    pub fn new(note_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            title: title.into(),
            note_type: default_note_type(),
            mime: default_mime(),
            is_protected: false,
            is_content_available: false,
            content_length: None,
            date_created: None,
            date_modified: None,
            utc_date_created: None,
            utc_date_modified: None,
        }
    }

    pub fn with_type(mut self, note_type: impl Into<String>, mime: impl Into<String>) -> Self {
        self.note_type = note_type.into();
        self.mime = mime.into();
        self
    }

    pub fn protected(mut self) -> Self {
        self.is_protected = true;
        self
    }
}

/// Lazily computed per-note views.
#[derive(Debug, Default)]
pub(crate) struct NoteCaches {
    pub(crate) attributes: OnceCell<Arc<[AttributeId]>>,
    pub(crate) inheritable_attributes: OnceCell<Arc<[AttributeId]>>,
    pub(crate) ancestors: OnceCell<Arc<[NoteId]>>,
    pub(crate) flat_text: OnceCell<Arc<str>>,
}

impl NoteCaches {
    pub(crate) fn clear(&mut self) {
        self.attributes.take();
        self.inheritable_attributes.take();
        self.ancestors.take();
        self.flat_text.take();
    }
}

/// Cache-side note entity.
#[derive(Debug)]
pub struct Note {
    pub note_id: NoteId,
    pub title: String,
    pub note_type: String,
    pub mime: String,
    pub is_protected: bool,
    /// `false` only for protected notes whose title is still encrypted.
    pub is_decrypted: bool,
    pub content_length: Option<i64>,
    pub date_created: Option<String>,
    pub date_modified: Option<String>,
    pub utc_date_created: Option<String>,
    pub utc_date_modified: Option<String>,
    pub(crate) parent_branches: Vec<BranchId>,
    pub(crate) parents: Vec<NoteId>,
    pub(crate) children: Vec<NoteId>,
    pub(crate) owned_attributes: Vec<AttributeId>,
    pub(crate) target_relations: Vec<AttributeId>,
    pub(crate) caches: NoteCaches,
}

impl Note {
    pub fn from_row(row: NoteRow) -> Self {
        let mut note = Self {
            note_id: row.note_id.clone(),
            title: String::new(),
            note_type: String::new(),
            mime: String::new(),
            is_protected: false,
            is_decrypted: true,
            content_length: None,
            date_created: None,
            date_modified: None,
            utc_date_created: None,
            utc_date_modified: None,
            parent_branches: Vec::new(),
            parents: Vec::new(),
            children: Vec::new(),
            owned_attributes: Vec::new(),
            target_relations: Vec::new(),
            caches: NoteCaches::default(),
        };
        note.apply_row(row);
        note
    }

    /// Replaces row-level fields, keeping graph edges intact.
    pub(crate) fn apply_row(&mut self, row: NoteRow) {
        self.title = row.title;
        self.note_type = row.note_type;
        self.mime = row.mime;
        self.is_protected = row.is_protected;
        self.is_decrypted = !row.is_protected || row.is_content_available;
        self.content_length = row.content_length;
        self.date_created = row.date_created;
        self.date_modified = row.date_modified;
        self.utc_date_created = row.utc_date_created;
        self.utc_date_modified = row.utc_date_modified;
    }

    /// Parent note ids, non-archived parents first once resorted.
    pub fn parents(&self) -> &[NoteId] {
        &self.parents
    }

    /// Child note ids ordered by branch position.
    pub fn children(&self) -> &[NoteId] {
        &self.children
    }

    pub fn parent_branches(&self) -> &[BranchId] {
        &self.parent_branches
    }

    pub fn owned_attributes(&self) -> &[AttributeId] {
        &self.owned_attributes
    }

    /// Relation attributes (owned by other notes) pointing at this note.
    pub fn target_relations(&self) -> &[AttributeId] {
        &self.target_relations
    }
}
