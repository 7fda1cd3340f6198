//! Tree-level comparison
//!
//! Produces the set of file paths whose entries differ between two trees.
//! Subtrees with identical ids are skipped without being read. The walk uses
//! an explicit work stack, so deeply nested trees cannot exhaust the call
//! stack.

use crate::areas::database::Database;
use crate::artifacts::core::error::DiffResult;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::objects::object_id::ObjectId;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub enum TreeChangeType {
    Added(DatabaseEntry),
    Deleted(DatabaseEntry),
    Modified {
        old: DatabaseEntry,
        new: DatabaseEntry,
    },
}

impl TreeChangeType {
    /// `None` when both sides are absent or identical (same id and mode)
    pub fn from_entries(old: Option<DatabaseEntry>, new: Option<DatabaseEntry>) -> Option<Self> {
        match (old, new) {
            (None, Some(new)) => Some(TreeChangeType::Added(new)),
            (Some(old), None) => Some(TreeChangeType::Deleted(old)),
            (Some(old), Some(new)) if old != new => Some(TreeChangeType::Modified { old, new }),
            _ => None,
        }
    }

    pub fn old_entry(&self) -> Option<&DatabaseEntry> {
        match self {
            TreeChangeType::Deleted(entry) => Some(entry),
            TreeChangeType::Modified { old, .. } => Some(old),
            TreeChangeType::Added(_) => None,
        }
    }

    pub fn new_entry(&self) -> Option<&DatabaseEntry> {
        match self {
            TreeChangeType::Added(entry) => Some(entry),
            TreeChangeType::Modified { new, .. } => Some(new),
            TreeChangeType::Deleted(_) => None,
        }
    }

    pub fn status_char(&self) -> char {
        match self {
            TreeChangeType::Added(_) => 'A',
            TreeChangeType::Deleted(_) => 'D',
            TreeChangeType::Modified { .. } => 'M',
        }
    }
}

/// Changed file paths, ordered segment by segment
pub type ChangeSet = BTreeMap<PathBuf, TreeChangeType>;
pub type TreeEntryMap = BTreeMap<String, DatabaseEntry>;

/// A pair of subtrees still to be compared
struct PendingTrees {
    prefix: PathBuf,
    old: Option<ObjectId>,
    new: Option<ObjectId>,
}

#[derive(Debug)]
pub struct TreeDiff<'r> {
    database: &'r Database,
    change_set: ChangeSet,
}

impl<'r> TreeDiff<'r> {
    pub fn new(database: &'r Database) -> Self {
        TreeDiff {
            database,
            change_set: BTreeMap::new(),
        }
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.change_set
    }

    pub fn into_changes(self) -> ChangeSet {
        self.change_set
    }

    /// Compare two roots; each may be a tree or a commit (peeled to its tree).
    /// A missing side counts as an empty tree.
    pub fn compare_oids(
        &mut self,
        old: Option<&ObjectId>,
        new: Option<&ObjectId>,
    ) -> DiffResult<()> {
        let old = old
            .map(|oid| self.database.peel_to_tree(oid))
            .transpose()?;
        let new = new
            .map(|oid| self.database.peel_to_tree(oid))
            .transpose()?;

        let mut stack = vec![PendingTrees {
            prefix: PathBuf::new(),
            old,
            new,
        }];

        while let Some(pending) = stack.pop() {
            if pending.old == pending.new {
                continue;
            }

            let old_entries = self.inflate_tree_entries(pending.old.as_ref())?;
            let new_entries = self.inflate_tree_entries(pending.new.as_ref())?;

            self.detect_deletions(&old_entries, &new_entries, &pending.prefix, &mut stack);
            self.detect_additions(&old_entries, &new_entries, &pending.prefix, &mut stack);
        }

        tracing::trace!(changes = self.change_set.len(), "compared trees");
        Ok(())
    }

    fn inflate_tree_entries(&self, oid: Option<&ObjectId>) -> DiffResult<TreeEntryMap> {
        match oid {
            None => Ok(BTreeMap::new()),
            Some(oid) => Ok(self
                .database
                .parse_object_as_tree(oid)?
                .into_entries()
                .collect()),
        }
    }

    /// Entries that changed or vanished; subtrees on either side are queued
    fn detect_deletions(
        &mut self,
        old: &TreeEntryMap,
        new: &TreeEntryMap,
        prefix: &Path,
        stack: &mut Vec<PendingTrees>,
    ) {
        for (name, entry) in old {
            let other = new.get(name);
            if other == Some(entry) {
                continue;
            }

            let path = prefix.join(name);
            let old_tree = entry.is_tree().then(|| entry.oid.clone());
            let new_tree = other.filter(|o| o.is_tree()).map(|o| o.oid.clone());
            if old_tree.is_some() || new_tree.is_some() {
                stack.push(PendingTrees {
                    prefix: path.clone(),
                    old: old_tree,
                    new: new_tree,
                });
            }

            let old_file = (!entry.is_tree()).then(|| entry.clone());
            let new_file = other.filter(|o| !o.is_tree()).cloned();
            if let Some(change_type) = TreeChangeType::from_entries(old_file, new_file) {
                self.change_set.insert(path, change_type);
            }
        }
    }

    fn detect_additions(
        &mut self,
        old: &TreeEntryMap,
        new: &TreeEntryMap,
        prefix: &Path,
        stack: &mut Vec<PendingTrees>,
    ) {
        for (name, entry) in new {
            if old.contains_key(name) {
                continue;
            }

            let path = prefix.join(name);
            if entry.is_tree() {
                stack.push(PendingTrees {
                    prefix: path,
                    old: None,
                    new: Some(entry.oid.clone()),
                });
            } else {
                self.change_set
                    .insert(path, TreeChangeType::Added(entry.clone()));
            }
        }
    }
}
