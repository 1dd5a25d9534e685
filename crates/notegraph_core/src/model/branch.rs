//! Branch entity: placement of a note under one parent.

use super::{BranchId, NoteId, ROOT_NOTE_ID};
use serde::{Deserialize, Serialize};

/// Branch row as materialized by the external loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchRow {
    pub branch_id: BranchId,
    pub note_id: NoteId,
    pub parent_note_id: NoteId,
    #[serde(default)]
    pub note_position: i64,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub is_expanded: bool,
    #[serde(default)]
    pub is_deleted: bool,
}

impl BranchRow {
    /// Builds an active branch placing `note_id` under `parent_note_id`.
    pub fn new(
        branch_id: impl Into<String>,
        note_id: impl Into<String>,
        parent_note_id: impl Into<String>,
    ) -> Self {
        Self {
            branch_id: branch_id.into(),
            note_id: note_id.into(),
            parent_note_id: parent_note_id.into(),
            note_position: 0,
            prefix: None,
            is_expanded: false,
            is_deleted: false,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_position(mut self, note_position: i64) -> Self {
        self.note_position = note_position;
        self
    }
}

/// Cache-side branch entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub branch_id: BranchId,
    /// Child note.
    pub note_id: NoteId,
    pub parent_note_id: NoteId,
    pub note_position: i64,
    /// Display prefix; blank prefixes are stored as `None`.
    pub prefix: Option<String>,
    is_expanded: bool,
    pub is_deleted: bool,
}

impl Branch {
    pub fn from_row(row: BranchRow) -> Self {
        let prefix = row.prefix.filter(|value| !value.trim().is_empty());
        Self {
            branch_id: row.branch_id,
            note_id: row.note_id,
            parent_note_id: row.parent_note_id,
            note_position: row.note_position,
            prefix,
            is_expanded: row.is_expanded,
            is_deleted: row.is_deleted,
        }
    }

    /// The root note is always considered expanded.
    pub fn is_expanded(&self) -> bool {
        self.is_expanded || self.note_id == ROOT_NOTE_ID
    }
}
