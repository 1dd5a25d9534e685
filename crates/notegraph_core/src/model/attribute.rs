//! Attribute entity (labels and relations).
//!
//! # Invariants
//! - `name` is lowercase.
//! - Label values are lowercase; relation values keep the target note id verbatim.

use super::{AttributeId, NoteId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Name of the relation that makes its owner inherit the target's attributes.
pub const TEMPLATE_RELATION: &str = "template";

/// Attribute kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// Key with optional text value.
    Label,
    /// Key whose value is the id of another note.
    Relation,
}

impl AttributeType {
    /// Marker character used in queries and flattened text.
    pub fn marker(self) -> char {
        match self {
            Self::Label => '#',
            Self::Relation => '~',
        }
    }
}

impl Display for AttributeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Label => write!(f, "label"),
            Self::Relation => write!(f, "relation"),
        }
    }
}

/// Attribute row as materialized by the external loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeRow {
    pub attribute_id: AttributeId,
    pub note_id: NoteId,
    #[serde(rename = "type")]
    pub kind: AttributeType,
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub is_inheritable: bool,
    #[serde(default)]
    pub position: i64,
}

impl AttributeRow {
    /// Builds a label row.
    pub fn label(
        attribute_id: impl Into<String>,
        note_id: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            attribute_id: attribute_id.into(),
            note_id: note_id.into(),
            kind: AttributeType::Label,
            name: name.into(),
            value: value.into(),
            is_inheritable: false,
            position: 0,
        }
    }

    /// Builds a relation row pointing at `target_note_id`.
    pub fn relation(
        attribute_id: impl Into<String>,
        note_id: impl Into<String>,
        name: impl Into<String>,
        target_note_id: impl Into<String>,
    ) -> Self {
        Self {
            attribute_id: attribute_id.into(),
            note_id: note_id.into(),
            kind: AttributeType::Relation,
            name: name.into(),
            value: target_note_id.into(),
            is_inheritable: false,
            position: 0,
        }
    }

    /// Marks the row inheritable.
    pub fn inheritable(mut self) -> Self {
        self.is_inheritable = true;
        self
    }
}

/// Cache-side attribute entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub attribute_id: AttributeId,
    /// Owning note.
    pub note_id: NoteId,
    pub kind: AttributeType,
    pub name: String,
    pub value: String,
    pub is_inheritable: bool,
    pub position: i64,
}

impl Attribute {
    /// Normalizes a loader row into an entity.
    pub fn from_row(row: AttributeRow) -> Self {
        let value = match row.kind {
            AttributeType::Label => row.value.to_lowercase(),
            AttributeType::Relation => row.value,
        };

        Self {
            attribute_id: row.attribute_id,
            note_id: row.note_id,
            kind: row.kind,
            name: row.name.to_lowercase(),
            value,
            is_inheritable: row.is_inheritable,
            position: row.position,
        }
    }

    /// Whether a change to this attribute can alter caches of other notes.
    pub fn is_affecting_subtree(&self) -> bool {
        self.is_inheritable || self.is_template_relation()
    }

    /// Whether this is a `template` relation.
    pub fn is_template_relation(&self) -> bool {
        self.kind == AttributeType::Relation && self.name == TEMPLATE_RELATION
    }

    /// Target note id for relations; `None` for labels.
    ///
    /// The id is not checked against the graph; use
    /// `GraphCache::note` to resolve it.
    pub fn target_note_id(&self) -> Option<&str> {
        match self.kind {
            AttributeType::Relation => Some(self.value.as_str()),
            AttributeType::Label => None,
        }
    }

    pub fn is_label(&self) -> bool {
        self.kind == AttributeType::Label
    }
}
