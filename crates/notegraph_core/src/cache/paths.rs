//! Note path resolution and path titles for search results.

use super::GraphCache;
use crate::model::{NoteId, ROOT_NOTE_ID};
use std::collections::{HashMap, HashSet, VecDeque};

const PROTECTED_TITLE: &str = "[protected]";

impl GraphCache {
    /// Root-to-note id path passing through `hoisted_note_id`.
    ///
    /// The shortest path avoiding archived parents wins; among equally short
    /// paths the resorted parent order decides. Returns `None` when the note
    /// is unknown or not reachable from the hoisted note.
    pub fn some_path(&self, note_id: &str, hoisted_note_id: &str) -> Option<Vec<NoteId>> {
        if hoisted_note_id == ROOT_NOTE_ID || !self.notes.contains_key(hoisted_note_id) {
            return self.path_up_to(note_id, ROOT_NOTE_ID);
        }

        let mut path = self.path_up_to(hoisted_note_id, ROOT_NOTE_ID)?;
        let below = self.path_up_to(note_id, hoisted_note_id)?;
        path.extend(below.into_iter().skip(1));
        Some(path)
    }

    /// Display title of `child_note_id` as placed under `parent_note_id`.
    ///
    /// A branch prefix renders as `prefix - title`.
    pub fn note_title(&self, child_note_id: &str, parent_note_id: &str) -> String {
        let Some(note) = self.notes.get(child_note_id) else {
            return String::new();
        };
        let title = if note.is_protected && !note.is_decrypted {
            PROTECTED_TITLE
        } else {
            note.title.as_str()
        };

        match self
            .get_branch(child_note_id, parent_note_id)
            .and_then(|branch| branch.prefix.as_deref())
        {
            Some(prefix) => format!("{prefix} - {title}"),
            None => title.to_string(),
        }
    }

    /// Titles of the path segments below the hoisted note, joined by ` / `.
    ///
    /// A path ending at the hoisted note renders that note's own title.
    pub fn note_title_for_path(&self, path: &[NoteId], hoisted_note_id: &str) -> String {
        if let [.., parent, last] = path {
            if last == hoisted_note_id {
                return self.note_title(last, parent);
            }
        }
        if let [only] = path {
            return self.note_title(only, ROOT_NOTE_ID);
        }

        let mut titles = Vec::new();
        let mut parent_note_id = ROOT_NOTE_ID;
        let mut hoisted_passed = false;
        for note_id in path {
            if hoisted_passed {
                titles.push(self.note_title(note_id, parent_note_id));
            }
            if note_id == hoisted_note_id {
                hoisted_passed = true;
            }
            parent_note_id = note_id;
        }
        titles.join(" / ")
    }

    /// Shortest top-down path from `top_id` to `note_id` following parent
    /// edges, avoiding parents with an inheritable `archived` label when
    /// such a path exists.
    fn path_up_to(&self, note_id: &str, top_id: &str) -> Option<Vec<NoteId>> {
        if !self.notes.contains_key(note_id) {
            return None;
        }
        self.shortest_path_up(note_id, top_id, true)
            .or_else(|| self.shortest_path_up(note_id, top_id, false))
    }

    /// Breadth-first walk up the parents; ties go to the earlier parent in
    /// the resorted parent list.
    fn shortest_path_up<'a>(
        &'a self,
        note_id: &'a str,
        top_id: &str,
        skip_archived: bool,
    ) -> Option<Vec<NoteId>> {
        let mut child_of: HashMap<&'a str, &'a str> = HashMap::new();
        let mut visited = HashSet::from([note_id]);
        let mut queue = VecDeque::from([note_id]);

        while let Some(current) = queue.pop_front() {
            if current == top_id {
                let mut path = vec![current.to_string()];
                let mut cursor = current;
                while let Some(child) = child_of.get(cursor) {
                    path.push(child.to_string());
                    cursor = child;
                }
                return Some(path);
            }

            let Some(note) = self.notes.get(current) else {
                continue;
            };
            for parent_id in &note.parents {
                if skip_archived && self.has_inheritable_owned_archived_label(parent_id) {
                    continue;
                }
                if visited.insert(parent_id.as_str()) {
                    child_of.insert(parent_id.as_str(), current);
                    queue.push_back(parent_id.as_str());
                }
            }
        }
        None
    }
}
