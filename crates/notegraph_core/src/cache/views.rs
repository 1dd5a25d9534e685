//! Memoized derived views over the graph (inheritance, text, traversal).
//!
//! # Invariants
//! - Every traversal carries a visited path/set; revisits contribute nothing.
//! - A value computed while a cycle cut the traversal short is returned but
//!   not memoized, so memoized values never depend on the entry point.

use super::{GraphCache, ARCHIVED_LABEL};
use crate::model::attribute::AttributeType;
use crate::model::note::Note;
use crate::model::{AttributeId, NoteId, ROOT_NOTE_ID};
use std::collections::HashSet;
use std::sync::Arc;

const HIDE_IN_AUTOCOMPLETE_LABEL: &str = "hideinautocomplete";

struct CollectedAttributes {
    all: Arc<[AttributeId]>,
    inheritable: Arc<[AttributeId]>,
    complete: bool,
}

impl CollectedAttributes {
    fn cut() -> Self {
        Self {
            all: Arc::from(Vec::new()),
            inheritable: Arc::from(Vec::new()),
            complete: false,
        }
    }
}

impl GraphCache {
    /// Full attribute list: owned, inherited from parents, then template-derived.
    ///
    /// Returns an empty list for unknown notes.
    pub fn attributes(&self, note_id: &str) -> Arc<[AttributeId]> {
        match self.notes.get(note_id) {
            Some(note) => self.collect_attributes(note, &mut Vec::new()).all,
            None => Arc::from(Vec::new()),
        }
    }

    /// Subset of [`GraphCache::attributes`] that propagates to descendants.
    pub fn inheritable_attributes(&self, note_id: &str) -> Arc<[AttributeId]> {
        match self.notes.get(note_id) {
            Some(note) => self.collect_inheritable(note, &mut Vec::new()).inheritable,
            None => Arc::from(Vec::new()),
        }
    }

    pub fn owned_attributes(&self, note_id: &str) -> &[AttributeId] {
        self.notes
            .get(note_id)
            .map(|note| note.owned_attributes.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_attribute(&self, note_id: &str, kind: AttributeType, name: &str) -> bool {
        self.find_effective(note_id, kind, name).is_some()
    }

    /// Value of the first effective label named `name`.
    pub fn label_value(&self, note_id: &str, name: &str) -> Option<String> {
        self.find_effective(note_id, AttributeType::Label, name)
    }

    /// Target id of the first effective relation named `name`, if it resolves.
    pub fn relation_target(&self, note_id: &str, name: &str) -> Option<NoteId> {
        self.find_effective(note_id, AttributeType::Relation, name)
            .filter(|target_id| self.notes.contains_key(target_id))
    }

    pub fn is_archived(&self, note_id: &str) -> bool {
        self.has_attribute(note_id, AttributeType::Label, ARCHIVED_LABEL)
    }

    pub fn is_hidden_in_autocomplete_or_archived(&self, note_id: &str) -> bool {
        self.attributes(note_id).iter().any(|attribute_id| {
            self.attributes.get(attribute_id).is_some_and(|attr| {
                attr.is_label()
                    && (attr.name == ARCHIVED_LABEL || attr.name == HIDE_IN_AUTOCOMPLETE_LABEL)
            })
        })
    }

    pub fn has_inheritable_owned_archived_label(&self, note_id: &str) -> bool {
        self.owned_attributes(note_id).iter().any(|attribute_id| {
            self.attributes.get(attribute_id).is_some_and(|attr| {
                attr.is_label() && attr.name == ARCHIVED_LABEL && attr.is_inheritable
            })
        })
    }

    /// Flattened lowercase text used by fulltext search.
    ///
    /// Archived and `hideInAutocomplete` notes flatten to `" "`.
    pub fn flat_text(&self, note_id: &str) -> Arc<str> {
        let Some(note) = self.notes.get(note_id) else {
            return Arc::from("");
        };
        if let Some(text) = note.caches.flat_text.get() {
            return text.clone();
        }

        let text: Arc<str> = Arc::from(self.build_flat_text(note));
        let _ = note.caches.flat_text.set(text.clone());
        text
    }

    /// Every note reachable upwards through `parents`, excluding the note itself.
    pub fn ancestors(&self, note_id: &str) -> Arc<[NoteId]> {
        let Some(note) = self.notes.get(note_id) else {
            return Arc::from(Vec::new());
        };
        if let Some(ancestors) = note.caches.ancestors.get() {
            return ancestors.clone();
        }

        let mut visited = HashSet::from([note.note_id.as_str()]);
        let mut ancestors = Vec::new();
        self.walk_ancestors(note, &mut visited, &mut ancestors);
        let ancestors: Arc<[NoteId]> = Arc::from(ancestors);
        let _ = note.caches.ancestors.set(ancestors.clone());
        ancestors
    }

    /// Whether `ancestor_id` is the note itself or one of its ancestors.
    pub fn is_in_ancestor(&self, note_id: &str, ancestor_id: &str) -> bool {
        note_id == ancestor_id || self.ancestors(note_id).iter().any(|id| id == ancestor_id)
    }

    /// The note followed by all its descendants (pre-order).
    pub fn subtree_notes(&self, note_id: &str) -> Vec<NoteId> {
        self.walk_down(note_id, false)
    }

    /// Like [`GraphCache::subtree_notes`], also following notes that use any
    /// subtree member as their template.
    pub fn subtree_notes_including_templated(&self, note_id: &str) -> Vec<NoteId> {
        self.walk_down(note_id, true)
    }

    /// The note plus every note whose attributes include its full attribute
    /// set through templates: direct users, users of users, and the subtrees
    /// of owners whose `template` relation is inheritable.
    pub fn templated_notes(&self, note_id: &str) -> Vec<NoteId> {
        let Some(note) = self.notes.get(note_id) else {
            return Vec::new();
        };
        let mut notes = vec![note.note_id.clone()];
        let mut visited = HashSet::from([note.note_id.clone()]);
        let mut index = 0;
        while index < notes.len() {
            if let Some(current) = self.notes.get(&notes[index]) {
                for user in self.template_users(current) {
                    if visited.insert(user.clone()) {
                        notes.push(user);
                    }
                }
            }
            index += 1;
        }
        notes
    }

    /// Whether any note uses this note as its template.
    pub fn is_template(&self, note_id: &str) -> bool {
        self.notes
            .get(note_id)
            .is_some_and(|note| !self.template_users(note).is_empty())
    }

    pub fn parent_count(&self, note_id: &str) -> usize {
        self.notes.get(note_id).map_or(0, |note| note.parents.len())
    }

    pub fn children_count(&self, note_id: &str) -> usize {
        self.notes.get(note_id).map_or(0, |note| note.children.len())
    }

    pub fn label_count(&self, note_id: &str) -> usize {
        self.count_attributes(note_id, Some(AttributeType::Label))
    }

    pub fn relation_count(&self, note_id: &str) -> usize {
        self.count_attributes(note_id, Some(AttributeType::Relation))
    }

    pub fn attribute_count(&self, note_id: &str) -> usize {
        self.count_attributes(note_id, None)
    }

    fn count_attributes(&self, note_id: &str, kind: Option<AttributeType>) -> usize {
        self.attributes(note_id)
            .iter()
            .filter_map(|attribute_id| self.attributes.get(attribute_id))
            .filter(|attr| kind.map_or(true, |kind| attr.kind == kind))
            .count()
    }

    fn find_effective(&self, note_id: &str, kind: AttributeType, name: &str) -> Option<String> {
        let name = name.to_lowercase();
        self.attributes(note_id)
            .iter()
            .filter_map(|attribute_id| self.attributes.get(attribute_id))
            .find(|attr| attr.kind == kind && attr.name == name)
            .map(|attr| attr.value.clone())
    }

    fn collect_attributes<'a>(
        &'a self,
        note: &'a Note,
        path: &mut Vec<&'a str>,
    ) -> CollectedAttributes {
        if path.contains(&note.note_id.as_str()) {
            return CollectedAttributes::cut();
        }
        if let (Some(all), Some(inheritable)) = (
            note.caches.attributes.get(),
            note.caches.inheritable_attributes.get(),
        ) {
            return CollectedAttributes {
                all: all.clone(),
                inheritable: inheritable.clone(),
                complete: true,
            };
        }

        let mut complete = true;
        let mut seen: HashSet<&str> = HashSet::new();
        let mut ids: Vec<AttributeId> = Vec::new();
        let mut push_unique = |ids: &mut Vec<AttributeId>, id: &'a str| {
            if seen.insert(id) {
                ids.push(id.to_string());
            }
        };

        for id in &note.owned_attributes {
            push_unique(&mut ids, id.as_str());
        }

        path.push(note.note_id.as_str());

        if note.note_id != ROOT_NOTE_ID {
            for parent_id in &note.parents {
                let Some(parent) = self.notes.get(parent_id) else {
                    continue;
                };
                let inherited = self.collect_inheritable(parent, path);
                complete &= inherited.complete;
                for id in inherited.inheritable.iter() {
                    if let Some(attr) = self.attributes.get_key_value(id) {
                        push_unique(&mut ids, attr.0.as_str());
                    }
                }
            }
        }

        // Includes inherited attributes so inherited templates apply too.
        let template_ids: Vec<&'a str> = ids
            .iter()
            .filter_map(|id| self.attributes.get(id))
            .filter(|attr| attr.is_template_relation())
            .map(|attr| attr.value.as_str())
            .collect();
        for template_id in template_ids {
            let Some(template) = self.notes.get(template_id) else {
                continue;
            };
            let templated = self.collect_attributes(template, path);
            complete &= templated.complete;
            for id in templated.all.iter() {
                if let Some(attr) = self.attributes.get_key_value(id) {
                    push_unique(&mut ids, attr.0.as_str());
                }
            }
        }

        path.pop();

        let inheritable: Arc<[AttributeId]> = ids
            .iter()
            .filter(|id| self.attributes.get(*id).is_some_and(|attr| attr.is_inheritable))
            .cloned()
            .collect();
        let all: Arc<[AttributeId]> = Arc::from(ids);

        if complete {
            let _ = note.caches.attributes.set(all.clone());
            let _ = note.caches.inheritable_attributes.set(inheritable.clone());
        }

        CollectedAttributes {
            all,
            inheritable,
            complete,
        }
    }

    fn collect_inheritable<'a>(
        &'a self,
        note: &'a Note,
        path: &mut Vec<&'a str>,
    ) -> CollectedAttributes {
        if path.contains(&note.note_id.as_str()) {
            return CollectedAttributes::cut();
        }
        self.collect_attributes(note, path)
    }

    fn build_flat_text(&self, note: &Note) -> String {
        if self.is_hidden_in_autocomplete_or_archived(&note.note_id) {
            return " ".to_string();
        }

        let mut text = format!("{} ", note.note_id);
        for branch_id in &note.parent_branches {
            if let Some(prefix) = self
                .branches
                .get(branch_id)
                .and_then(|branch| branch.prefix.as_deref())
            {
                text.push_str(prefix);
                text.push_str(" - ");
            }
        }
        text.push_str(&note.title);
        text.push(' ');

        for attribute_id in self.attributes(&note.note_id).iter() {
            let Some(attr) = self.attributes.get(attribute_id) else {
                continue;
            };
            text.push(' ');
            text.push(if attr.is_label() { '#' } else { '@' });
            text.push_str(&attr.name);
            if !attr.value.is_empty() {
                text.push('=');
                text.push_str(&attr.value);
            }
        }

        text.to_lowercase()
    }

    fn walk_ancestors<'a>(
        &'a self,
        note: &'a Note,
        visited: &mut HashSet<&'a str>,
        out: &mut Vec<NoteId>,
    ) {
        for parent_id in &note.parents {
            if !visited.insert(parent_id.as_str()) {
                continue;
            }
            out.push(parent_id.clone());
            if let Some(parent) = self.notes.get(parent_id) {
                self.walk_ancestors(parent, visited, out);
            }
        }
    }

    fn walk_down(&self, note_id: &str, follow_templates: bool) -> Vec<NoteId> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![note_id.to_string()];

        while let Some(current) = stack.pop() {
            let Some(note) = self.notes.get(&current) else {
                continue;
            };
            if !visited.insert(current.clone()) {
                continue;
            }
            // Reverse so the pre-order follows child position.
            if follow_templates {
                stack.extend(self.template_users(note).into_iter().rev());
            }
            stack.extend(note.children.iter().rev().cloned());
            order.push(current);
        }
        order
    }
}
