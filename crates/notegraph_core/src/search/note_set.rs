//! Insertion-ordered set of note ids, the unit of expression evaluation.

use crate::model::NoteId;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteSet {
    ids: Vec<NoteId>,
    index: HashSet<NoteId>,
    /// Set by explicit ordering; the orchestrator then keeps this order.
    pub sorted: bool,
}

impl NoteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NoteId>,
    {
        let mut set = Self::new();
        for id in ids {
            set.add(id);
        }
        set
    }

    /// Adds `note_id`; returns `false` when it was already present.
    pub fn add(&mut self, note_id: impl Into<NoteId>) -> bool {
        let note_id = note_id.into();
        if self.index.contains(&note_id) {
            return false;
        }
        self.index.insert(note_id.clone());
        self.ids.push(note_id);
        true
    }

    pub fn add_all(&mut self, other: &NoteSet) {
        for id in &other.ids {
            self.add(id.as_str());
        }
    }

    pub fn has(&self, note_id: &str) -> bool {
        self.index.contains(note_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NoteId> {
        self.ids.iter()
    }

    pub fn ids(&self) -> &[NoteId] {
        &self.ids
    }

    /// Members also in `other`, in this set's order.
    pub fn intersection(&self, other: &NoteSet) -> NoteSet {
        NoteSet::from_ids(self.ids.iter().filter(|id| other.has(id)).cloned())
    }

    /// This set's members followed by the new members of `other`.
    pub fn union(&self, other: &NoteSet) -> NoteSet {
        let mut result = self.clone();
        result.sorted = false;
        result.add_all(other);
        result
    }

    /// Members not in `other`.
    pub fn minus(&self, other: &NoteSet) -> NoteSet {
        NoteSet::from_ids(self.ids.iter().filter(|id| !other.has(id)).cloned())
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        for id in self.ids.drain(len.min(self.ids.len())..) {
            self.index.remove(&id);
        }
    }

    pub(crate) fn into_ids(self) -> Vec<NoteId> {
        self.ids
    }
}

impl<'a> IntoIterator for &'a NoteSet {
    type Item = &'a NoteId;
    type IntoIter = std::slice::Iter<'a, NoteId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}
