//! In-memory graph cache over notes, branches and attributes.
//!
//! # Responsibility
//! - Own every entity in id-keyed tables (the only live copy).
//! - Maintain the `(child, parent) -> branch` and `(type, name) -> attributes`
//!   indexes.
//! - Apply incremental updates and the cache invalidation they imply.
//!
//! # Invariants
//! - The `root` note never has parents.
//! - Deleted branches are never linked into `parents`/`children`.
//! - Every mutation finishes its invalidation before returning; queries take
//!   `&GraphCache`, so they can never overlap a mutation.
//!
//! # See also
//! - `views` for memoized derived data, `paths` for result path resolution.

mod paths;
mod views;

use crate::model::attribute::{Attribute, AttributeRow, AttributeType};
use crate::model::branch::{Branch, BranchRow};
use crate::model::note::{Note, NoteRow};
use crate::model::snapshot::{GraphLoader, GraphSnapshot, LoadError};
use crate::model::{AttributeId, BranchId, NoteId, ROOT_NOTE_ID};
use log::{info, warn};
use std::collections::{BTreeMap, HashMap, HashSet};

const ARCHIVED_LABEL: &str = "archived";

/// Explicitly owned graph cache instance.
#[derive(Debug, Default)]
pub struct GraphCache {
    notes: BTreeMap<NoteId, Note>,
    branches: HashMap<BranchId, Branch>,
    attributes: HashMap<AttributeId, Attribute>,
    child_parent_to_branch: HashMap<(NoteId, NoteId), BranchId>,
    attribute_index: HashMap<(AttributeType, String), Vec<AttributeId>>,
    loaded: bool,
}

impl GraphCache {
    /// Creates an empty, not-yet-loaded cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache and bulk-loads `snapshot` into it.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let mut cache = Self::new();
        cache.load(snapshot);
        cache
    }

    /// Discards all entities and indexes.
    pub fn reset(&mut self) {
        self.notes.clear();
        self.branches.clear();
        self.attributes.clear();
        self.child_parent_to_branch.clear();
        self.attribute_index.clear();
        self.loaded = false;
        info!("event=graph_reset module=cache status=ok");
    }

    /// Resets the cache and reloads it from the loader collaborator.
    ///
    /// # Errors
    /// - Returns the loader error; the cache stays empty in that case.
    pub fn reload(&mut self, loader: &dyn GraphLoader) -> Result<(), LoadError> {
        self.reset();
        let snapshot = loader.load_snapshot().map_err(|err| {
            warn!("event=graph_load module=cache status=error error={err}");
            err
        })?;
        self.load(snapshot);
        Ok(())
    }

    /// Bulk-loads a snapshot on top of the current content.
    ///
    /// Rows referencing missing notes are skipped with a warning.
    pub fn load(&mut self, snapshot: GraphSnapshot) {
        let GraphSnapshot {
            notes,
            branches,
            attributes,
        } = snapshot;

        for row in notes {
            let note = Note::from_row(row);
            self.notes.insert(note.note_id.clone(), note);
        }

        let mut touched_parents = HashSet::new();
        for row in branches {
            if row.is_deleted {
                continue;
            }
            let branch = Branch::from_row(row);
            touched_parents.insert(branch.parent_note_id.clone());
            self.insert_branch(branch);
        }
        for parent_id in touched_parents {
            self.sort_children(&parent_id);
        }

        for row in attributes {
            self.insert_attribute(Attribute::from_row(row));
        }

        let note_ids: Vec<NoteId> = self.notes.keys().cloned().collect();
        for note_id in &note_ids {
            self.resort_parents(note_id);
        }
        for note in self.notes.values_mut() {
            note.caches.clear();
        }

        self.loaded = true;
        info!(
            "event=graph_load module=cache status=ok notes={} branches={} attributes={}",
            self.notes.len(),
            self.branches.len(),
            self.attributes.len()
        );
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn note(&self, note_id: &str) -> Option<&Note> {
        self.notes.get(note_id)
    }

    pub fn branch(&self, branch_id: &str) -> Option<&Branch> {
        self.branches.get(branch_id)
    }

    pub fn attribute(&self, attribute_id: &str) -> Option<&Attribute> {
        self.attributes.get(attribute_id)
    }

    /// All notes in id order.
    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.notes.values()
    }

    pub fn note_ids(&self) -> impl Iterator<Item = &NoteId> {
        self.notes.keys()
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Whether the note exists in the cache (soft-deleted notes are never loaded).
    pub fn is_available(&self, note_id: &str) -> bool {
        self.notes.contains_key(note_id)
    }

    /// Active branch placing `child_note_id` under `parent_note_id`.
    pub fn get_branch(&self, child_note_id: &str, parent_note_id: &str) -> Option<&Branch> {
        self.child_parent_to_branch
            .get(&(child_note_id.to_string(), parent_note_id.to_string()))
            .and_then(|branch_id| self.branches.get(branch_id))
    }

    /// Attributes with exactly this type and (case-insensitive) name.
    pub fn find_attributes(&self, kind: AttributeType, name: &str) -> &[AttributeId] {
        self.attribute_index
            .get(&(kind, name.to_lowercase()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Attributes of this type whose name starts with `prefix`.
    pub fn find_attributes_with_prefix(&self, kind: AttributeType, prefix: &str) -> Vec<AttributeId> {
        let prefix = prefix.to_lowercase();
        let mut keys: Vec<&(AttributeType, String)> = self
            .attribute_index
            .keys()
            .filter(|(key_kind, key_name)| *key_kind == kind && key_name.starts_with(&prefix))
            .collect();
        keys.sort();
        keys.into_iter()
            .flat_map(|key| self.attribute_index[key].iter().cloned())
            .collect()
    }

    /// Inserts or replaces one note from a store notification.
    pub fn upsert_note(&mut self, row: NoteRow) {
        if let Some(note) = self.notes.get_mut(&row.note_id) {
            let note_id = note.note_id.clone();
            note.apply_row(row);
            self.invalidate_note(&note_id);
            self.invalidate_subtree_flat_text(&note_id);
            return;
        }

        let note_id = row.note_id.clone();
        self.notes.insert(note_id.clone(), Note::from_row(row));

        // Relink rows that arrived before the note did.
        let pending_branches: Vec<Branch> = self
            .branches
            .values()
            .filter(|branch| branch.note_id == note_id || branch.parent_note_id == note_id)
            .cloned()
            .collect();
        for branch in pending_branches {
            self.link_branch(&branch);
            self.sort_children(&branch.parent_note_id);
        }

        let incoming: Vec<AttributeId> = self
            .attributes
            .values()
            .filter(|attr| attr.target_note_id() == Some(note_id.as_str()))
            .map(|attr| attr.attribute_id.clone())
            .collect();
        for attribute_id in incoming {
            let owner = self.attributes[&attribute_id].note_id.clone();
            if let Some(note) = self.notes.get_mut(&note_id) {
                note.target_relations.push(attribute_id);
            }
            self.invalidate_subtree(&owner);
        }

        self.resort_parents(&note_id);
        self.invalidate_subtree(&note_id);
    }

    /// Removes one note together with its owned attributes and branches.
    pub fn delete_note(&mut self, note_id: &str) {
        let Some(note) = self.notes.get(note_id) else {
            return;
        };
        let owned = note.owned_attributes.clone();
        let branch_ids: Vec<BranchId> = self
            .branches
            .values()
            .filter(|branch| branch.note_id == note_id || branch.parent_note_id == note_id)
            .map(|branch| branch.branch_id.clone())
            .collect();
        let templated = self.templated_notes(note_id);

        for attribute_id in owned {
            self.delete_attribute(&attribute_id);
        }
        for branch_id in branch_ids {
            self.delete_branch(&branch_id);
        }
        self.notes.remove(note_id);
        for templated_id in templated.iter().filter(|id| id.as_str() != note_id) {
            self.invalidate_subtree(templated_id);
        }
    }

    /// Inserts or replaces one branch; a deleted row removes the branch.
    pub fn upsert_branch(&mut self, row: BranchRow) {
        if self.branches.contains_key(&row.branch_id) {
            self.delete_branch(&row.branch_id.clone());
        }
        if row.is_deleted {
            return;
        }

        let branch = Branch::from_row(row);
        let child_id = branch.note_id.clone();
        let parent_id = branch.parent_note_id.clone();
        self.insert_branch(branch);
        self.sort_children(&parent_id);
        self.resort_parents(&child_id);
        self.invalidate_subtree(&child_id);
    }

    /// Removes one branch and invalidates the detached subtree.
    pub fn delete_branch(&mut self, branch_id: &str) {
        let Some(branch) = self.branches.remove(branch_id) else {
            return;
        };

        self.invalidate_subtree(&branch.note_id);

        let pair = (branch.note_id.clone(), branch.parent_note_id.clone());
        if self.child_parent_to_branch.get(&pair) == Some(&branch.branch_id) {
            self.child_parent_to_branch.remove(&pair);
        }
        if let Some(child) = self.notes.get_mut(&branch.note_id) {
            child.parent_branches.retain(|id| id != &branch.branch_id);
            if let Some(index) = child
                .parents
                .iter()
                .position(|id| id == &branch.parent_note_id)
            {
                child.parents.remove(index);
            }
        }
        if let Some(parent) = self.notes.get_mut(&branch.parent_note_id) {
            if let Some(index) = parent.children.iter().position(|id| id == &branch.note_id) {
                parent.children.remove(index);
            }
        }
    }

    /// Inserts or replaces one attribute.
    pub fn upsert_attribute(&mut self, row: AttributeRow) {
        let mut affects_subtree = false;
        if let Some(old) = self.remove_attribute(&row.attribute_id) {
            affects_subtree |= old.is_affecting_subtree();
            self.after_attribute_change(&old, affects_subtree);
        }

        let attr = Attribute::from_row(row);
        affects_subtree |= attr.is_affecting_subtree();
        if self.insert_attribute(attr.clone()) {
            self.after_attribute_change(&attr, affects_subtree);
        }
    }

    /// Removes one attribute.
    pub fn delete_attribute(&mut self, attribute_id: &str) {
        if let Some(old) = self.remove_attribute(attribute_id) {
            let affects_subtree = old.is_affecting_subtree();
            self.after_attribute_change(&old, affects_subtree);
        }
    }

    /// Clears the memoized views of one note only.
    pub fn invalidate_note(&mut self, note_id: &str) {
        if let Some(note) = self.notes.get_mut(note_id) {
            note.caches.clear();
        }
    }

    /// Clears memoized views of the note, its descendants and every note
    /// templated from any of them.
    pub fn invalidate_subtree(&mut self, note_id: &str) {
        for id in self.invalidation_closure(note_id) {
            if let Some(note) = self.notes.get_mut(&id) {
                note.caches.clear();
            }
        }
    }

    /// Like [`GraphCache::invalidate_subtree`] but clears flat text only.
    pub fn invalidate_subtree_flat_text(&mut self, note_id: &str) {
        for id in self.invalidation_closure(note_id) {
            if let Some(note) = self.notes.get_mut(&id) {
                note.caches.flat_text.take();
            }
        }
    }

    /// Sorts parents so that parents owning an inheritable `archived` label
    /// come last.
    pub fn resort_parents(&mut self, note_id: &str) {
        let Some(note) = self.notes.get(note_id) else {
            return;
        };
        let mut keyed: Vec<(bool, NoteId)> = note
            .parents
            .iter()
            .map(|parent_id| {
                (
                    self.has_inheritable_owned_archived_label(parent_id),
                    parent_id.clone(),
                )
            })
            .collect();
        keyed.sort_by_key(|(archived, _)| *archived);
        if let Some(note) = self.notes.get_mut(note_id) {
            note.parents = keyed.into_iter().map(|(_, id)| id).collect();
        }
    }

    /// Clears notes that use `note_id` as a template, transitively.
    fn invalidate_templated(&mut self, note_id: &str) {
        for templated_id in self.templated_notes(note_id).iter().skip(1) {
            self.invalidate_note(templated_id);
        }
    }

    fn invalidation_closure(&self, note_id: &str) -> Vec<NoteId> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![note_id.to_string()];

        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let Some(note) = self.notes.get(&current) else {
                continue;
            };
            stack.extend(note.children.iter().cloned());
            stack.extend(self.template_users(note));
            order.push(current);
        }
        order
    }

    fn insert_branch(&mut self, branch: Branch) {
        self.link_branch(&branch);
        self.branches.insert(branch.branch_id.clone(), branch);
    }

    /// Links a stored branch into its notes; safe to call repeatedly.
    fn link_branch(&mut self, branch: &Branch) {
        let Some(child) = self.notes.get_mut(&branch.note_id) else {
            warn!(
                "event=orphan_branch module=cache status=skipped branch_id={} note_id={}",
                branch.branch_id, branch.note_id
            );
            return;
        };
        if !child.parent_branches.contains(&branch.branch_id) {
            child.parent_branches.push(branch.branch_id.clone());
        }

        if branch.note_id == ROOT_NOTE_ID || !self.notes.contains_key(&branch.parent_note_id) {
            return;
        }

        let pair = (branch.note_id.clone(), branch.parent_note_id.clone());
        if self.child_parent_to_branch.contains_key(&pair) {
            return;
        }
        self.child_parent_to_branch
            .insert(pair, branch.branch_id.clone());

        if let Some(child) = self.notes.get_mut(&branch.note_id) {
            child.parents.push(branch.parent_note_id.clone());
        }
        if let Some(parent) = self.notes.get_mut(&branch.parent_note_id) {
            parent.children.push(branch.note_id.clone());
        }
    }

    fn sort_children(&mut self, parent_id: &str) {
        let Some(parent) = self.notes.get(parent_id) else {
            return;
        };
        let mut keyed: Vec<(i64, NoteId)> = parent
            .children
            .iter()
            .map(|child_id| {
                let position = self
                    .get_branch(child_id, parent_id)
                    .map_or(0, |branch| branch.note_position);
                (position, child_id.clone())
            })
            .collect();
        keyed.sort_by_key(|(position, _)| *position);
        if let Some(parent) = self.notes.get_mut(parent_id) {
            parent.children = keyed.into_iter().map(|(_, id)| id).collect();
        }
    }

    /// Returns `false` when the owner note is unknown.
    fn insert_attribute(&mut self, attr: Attribute) -> bool {
        let Some(owner) = self.notes.get_mut(&attr.note_id) else {
            warn!(
                "event=orphan_attribute module=cache status=skipped attribute_id={} note_id={}",
                attr.attribute_id, attr.note_id
            );
            return false;
        };
        owner.owned_attributes.push(attr.attribute_id.clone());

        self.attribute_index
            .entry((attr.kind, attr.name.clone()))
            .or_default()
            .push(attr.attribute_id.clone());

        if let Some(target_id) = attr.target_note_id() {
            if let Some(target) = self.notes.get_mut(target_id) {
                target.target_relations.push(attr.attribute_id.clone());
            }
        }

        self.attributes.insert(attr.attribute_id.clone(), attr);
        true
    }

    fn remove_attribute(&mut self, attribute_id: &str) -> Option<Attribute> {
        let attr = self.attributes.remove(attribute_id)?;

        if let Some(owner) = self.notes.get_mut(&attr.note_id) {
            owner.owned_attributes.retain(|id| id != attribute_id);
        }
        let key = (attr.kind, attr.name.clone());
        if let Some(ids) = self.attribute_index.get_mut(&key) {
            ids.retain(|id| id != attribute_id);
            if ids.is_empty() {
                self.attribute_index.remove(&key);
            }
        }
        if let Some(target_id) = attr.target_note_id() {
            if let Some(target) = self.notes.get_mut(target_id) {
                target.target_relations.retain(|id| id != attribute_id);
            }
        }
        Some(attr)
    }

    fn after_attribute_change(&mut self, attr: &Attribute, affects_subtree: bool) {
        if affects_subtree {
            self.invalidate_subtree(&attr.note_id);
        } else {
            self.invalidate_note(&attr.note_id);
            self.invalidate_templated(&attr.note_id);
        }

        if attr.is_label() && attr.name == ARCHIVED_LABEL {
            let children = self
                .notes
                .get(&attr.note_id)
                .map(|note| note.children.clone())
                .unwrap_or_default();
            for child_id in children {
                self.resort_parents(&child_id);
            }
        }
    }

    /// Notes taking `note` as their direct template: owners of `template`
    /// relations pointing at it, widened to the owner's subtree when the
    /// relation is inheritable.
    fn template_users(&self, note: &Note) -> Vec<NoteId> {
        let mut users: Vec<NoteId> = Vec::new();
        for attr in note
            .target_relations
            .iter()
            .filter_map(|attribute_id| self.attributes.get(attribute_id))
            .filter(|attr| attr.is_template_relation() && self.notes.contains_key(&attr.note_id))
        {
            let reached = if attr.is_inheritable {
                self.subtree_notes(&attr.note_id)
            } else {
                vec![attr.note_id.clone()]
            };
            for id in reached {
                if !users.contains(&id) {
                    users.push(id);
                }
            }
        }
        users
    }
}
