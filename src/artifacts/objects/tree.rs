//! Tree object
//!
//! Trees represent directory snapshots. They map path segments to blobs
//! (files) and other trees (subdirectories), along with their modes.
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`
//! Each entry: `<mode> <name>\0<20-byte-sha1>`
//!
//! Entries are written in the canonical order where a directory `name`
//! sorts as if it were `name/`, so identical snapshots hash identically.

use crate::artifacts::core::error::{DiffError, DiffResult};
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::{Object, Packable, Unpackable, frame};
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::BufRead;

/// Directory snapshot keyed by path segment
///
/// No two entries share a name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: BTreeMap<String, DatabaseEntry>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a child entry
    ///
    /// Fails if `name` is already present or is not a single path segment.
    pub fn add_entry(&mut self, name: &str, oid: ObjectId, mode: EntryMode) -> DiffResult<()> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
            return Err(DiffError::InvalidPathSegment {
                name: name.to_string(),
            });
        }
        if self.entries.contains_key(name) {
            return Err(DiffError::DuplicateTreeEntry {
                name: name.to_string(),
            });
        }

        self.entries
            .insert(name.to_string(), DatabaseEntry::new(oid, mode));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&DatabaseEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &DatabaseEntry)> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> impl Iterator<Item = (String, DatabaseEntry)> {
        self.entries.into_iter()
    }

    /// Entries in the canonical on-disk order
    fn canonical_entries(&self) -> Vec<(&String, &DatabaseEntry)> {
        let mut entries = self.entries.iter().collect::<Vec<_>>();
        entries.sort_by_cached_key(|(name, entry)| {
            let mut key = name.as_bytes().to_vec();
            if entry.is_tree() {
                key.push(b'/');
            }
            key
        });
        entries
    }
}

impl Packable for Tree {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut content = Vec::new();

        for (name, entry) in self.canonical_entries() {
            content.extend_from_slice(format!("{:o} {}", entry.mode.as_u32(), name).as_bytes());
            content.push(0);
            entry.oid.write_h40_to(&mut content)?;
        }

        Ok(frame(self.object_type(), &content))
    }
}

impl Unpackable for Tree {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut entries = BTreeMap::new();
        let mut reader = reader;

        // Reuse scratch buffers to reduce allocs
        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            let n = reader.read_until(b' ', &mut mode_bytes)?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            if mode_bytes.pop() != Some(b' ') {
                anyhow::bail!("unexpected EOF in mode");
            }

            let mode = EntryMode::from_octal_str(std::str::from_utf8(&mode_bytes)?)?;

            name_bytes.clear();
            reader.read_until(b'\0', &mut name_bytes)?;
            if name_bytes.pop() != Some(b'\0') {
                anyhow::bail!("unexpected EOF in name");
            }
            let name = String::from_utf8_lossy(&name_bytes).into_owned();

            let oid =
                ObjectId::read_h40_from(&mut reader).context("unexpected EOF in object id")?;

            if entries
                .insert(name.clone(), DatabaseEntry::new(oid, mode))
                .is_some()
            {
                anyhow::bail!("duplicate entry '{name}'");
            }
        }

        Ok(Tree { entries })
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn display(&self) -> String {
        self.canonical_entries()
            .into_iter()
            .map(|(name, entry)| {
                let kind = match entry.mode {
                    EntryMode::Directory => ObjectType::Tree.as_str(),
                    EntryMode::Gitlink => "commit",
                    EntryMode::File(_) => ObjectType::Blob.as_str(),
                };
                format!("{:0>6} {} {}\t{}", entry.mode.as_str(), kind, entry.oid, name)
            })
            .collect::<Vec<String>>()
            .join("\n")
    }

    fn references(&self) -> Vec<ObjectId> {
        self.entries
            .values()
            .filter(|entry| entry.mode != EntryMode::Gitlink)
            .map(|entry| entry.oid.clone())
            .collect()
    }
}
