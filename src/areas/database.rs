//! Content-addressed object store
//!
//! Objects live under `<objects>/<2 hex>/<38 hex>`, zlib-compressed. The
//! store never updates or deletes: writing an object that already exists is a
//! no-op, and every write goes through a temp file plus rename.
//!
//! Reads only touch the filesystem, so a `Database` can be shared between
//! threads behind an `Arc` without locking.

use crate::artifacts::core::error::{DiffError, DiffResult};
use crate::artifacts::diff::tree_diff::TreeDiff;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::{Commit, SlimCommit};
use crate::artifacts::objects::entry_mode::{EntryMode, FileMode};
use crate::artifacts::objects::object::{Object, ObjectBox, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use bytes::Bytes;
use fake::rand;
use sha1::{Digest, Sha1};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
}

// TODO: read packfiles so repositories that have been gc'ed can be diffed
impl Database {
    pub fn new(path: Box<Path>) -> Self {
        Database { path }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, object_id: &ObjectId) -> bool {
        self.path.join(object_id.to_path()).is_file()
    }

    /// Compare two trees (or commits, peeled to their trees)
    pub fn tree_diff(
        &self,
        old_oid: Option<&ObjectId>,
        new_oid: Option<&ObjectId>,
    ) -> DiffResult<TreeDiff<'_>> {
        let mut tree_diff = TreeDiff::new(self);
        tree_diff.compare_oids(old_oid, new_oid)?;
        Ok(tree_diff)
    }

    /// Raw object bytes, header included
    pub fn load(&self, object_id: &ObjectId) -> DiffResult<Bytes> {
        let object_path = self.path.join(object_id.to_path());

        self.read_object(object_id, object_path)
    }

    /// Store an object and return its id
    ///
    /// Everything the object references (commit parents and tree, tree
    /// children) must already be stored, which keeps history acyclic.
    pub fn store(&self, object: &impl Object) -> DiffResult<ObjectId> {
        let object_id = object.object_id().map_err(std::io::Error::other)?;

        if let Some(missing) = object
            .references()
            .into_iter()
            .find(|oid| !self.contains(oid))
        {
            return Err(DiffError::ObjectNotFound { oid: missing });
        }

        let object_path = self.path.join(object_id.to_path());
        if !object_path.exists() {
            let object_content = object
                .serialize()
                .map_err(|e| DiffError::malformed(&object_id, e))?;
            let object_dir = object_path
                .parent()
                .ok_or_else(|| DiffError::malformed(&object_id, "invalid object path"))?;
            std::fs::create_dir_all(object_dir)?;

            self.write_object(&object_path, object_content)?;
            tracing::trace!(oid = %object_id, kind = %object.object_type(), "stored object");
        }

        Ok(object_id)
    }

    pub fn parse_object(&self, object_id: &ObjectId) -> DiffResult<ObjectBox> {
        let bytes = self.load(object_id)?;

        Self::decode(object_id, bytes)
    }

    fn decode(object_id: &ObjectId, bytes: Bytes) -> DiffResult<ObjectBox> {
        let total = bytes.len();
        let mut object_reader = Cursor::new(bytes);
        let object_type = ObjectType::parse_object_type(&mut object_reader, Some(total))
            .map_err(|e| DiffError::malformed(object_id, e))?;

        let object = match object_type {
            ObjectType::Blob => Blob::deserialize(object_reader).map(|b| ObjectBox::Blob(Box::new(b))),
            ObjectType::Tree => Tree::deserialize(object_reader).map(|t| ObjectBox::Tree(Box::new(t))),
            ObjectType::Commit => {
                Commit::deserialize(object_reader).map(|c| ObjectBox::Commit(Box::new(c)))
            }
        };

        object.map_err(|e| DiffError::malformed(object_id, e))
    }

    pub fn parse_object_as_blob(&self, object_id: &ObjectId) -> DiffResult<Blob> {
        match self.parse_object(object_id)? {
            ObjectBox::Blob(blob) => Ok(*blob),
            other => Err(Self::unexpected(object_id, ObjectType::Blob, &other)),
        }
    }

    pub fn parse_object_as_tree(&self, object_id: &ObjectId) -> DiffResult<Tree> {
        match self.parse_object(object_id)? {
            ObjectBox::Tree(tree) => Ok(*tree),
            other => Err(Self::unexpected(object_id, ObjectType::Tree, &other)),
        }
    }

    pub fn parse_object_as_commit(&self, object_id: &ObjectId) -> DiffResult<Commit> {
        match self.parse_object(object_id)? {
            ObjectBox::Commit(commit) => Ok(*commit),
            other => Err(Self::unexpected(object_id, ObjectType::Commit, &other)),
        }
    }

    /// Tree id for a tree or commit id
    pub fn peel_to_tree(&self, object_id: &ObjectId) -> DiffResult<ObjectId> {
        match self.parse_object(object_id)? {
            ObjectBox::Tree(_) => Ok(object_id.clone()),
            ObjectBox::Commit(commit) => Ok(commit.tree_oid().clone()),
            other => Err(Self::unexpected(object_id, ObjectType::Tree, &other)),
        }
    }

    fn unexpected(object_id: &ObjectId, expected: ObjectType, actual: &ObjectBox) -> DiffError {
        DiffError::UnexpectedObjectType {
            oid: object_id.clone(),
            expected,
            actual: actual.object_type(),
        }
    }

    pub fn get_object_type(&self, object_id: &ObjectId) -> DiffResult<ObjectType> {
        let bytes = self.load(object_id)?;
        let total = bytes.len();

        ObjectType::parse_object_type(&mut Cursor::new(bytes), Some(total))
            .map_err(|e| DiffError::malformed(object_id, e))
    }

    /// Build and store nested trees for a flat set of slash-separated paths
    ///
    /// Returns the id of the root tree. Blobs are stored as regular files.
    pub fn write_snapshot<P, C>(&self, files: impl IntoIterator<Item = (P, C)>) -> DiffResult<ObjectId>
    where
        P: AsRef<str>,
        C: Into<Bytes>,
    {
        self.write_snapshot_with_modes(
            files
                .into_iter()
                .map(|(path, content)| (path, FileMode::Regular, content)),
        )
    }

    pub fn write_snapshot_with_modes<P, C>(
        &self,
        files: impl IntoIterator<Item = (P, FileMode, C)>,
    ) -> DiffResult<ObjectId>
    where
        P: AsRef<str>,
        C: Into<Bytes>,
    {
        let mut root = SnapshotNode::default();

        for (path, mode, content) in files {
            let blob_oid = self.store(&Blob::new(content))?;
            root.insert(path.as_ref(), blob_oid, mode)?;
        }

        root.store(self)
    }

    fn read_object(&self, object_id: &ObjectId, object_path: PathBuf) -> DiffResult<Bytes> {
        let object_content = match std::fs::read(&object_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DiffError::ObjectNotFound {
                    oid: object_id.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let object_content = Self::decompress(object_content.into())
            .map_err(|e| DiffError::malformed(object_id, e))?;

        let mut hasher = Sha1::new();
        hasher.update(&object_content);
        let actual = ObjectId::from_digest(&hasher.finalize())
            .map_err(|e| DiffError::malformed(object_id, e))?;
        if &actual != object_id {
            return Err(DiffError::malformed(
                object_id,
                format!("content hashes to {actual}"),
            ));
        }

        Ok(object_content)
    }

    fn write_object(&self, object_path: &Path, object_content: Bytes) -> DiffResult<()> {
        let object_dir = object_path.parent().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Invalid object path {}", object_path.display()),
            )
        })?;
        let temp_object_path = object_dir.join(Self::generate_temp_name());

        let object_content = Self::compress(object_content)?;

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_object_path)?;
        file.write_all(&object_content)?;

        // rename the temp file to the object file to make it atomic
        std::fs::rename(&temp_object_path, object_path)?;

        Ok(())
    }

    fn compress(data: Bytes) -> std::io::Result<Bytes> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&data)?;

        encoder.finish().map(Bytes::from)
    }

    fn decompress(data: Bytes) -> std::io::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(&*data);
        let mut decompressed_content = Vec::new();
        decoder.read_to_end(&mut decompressed_content)?;

        Ok(decompressed_content.into())
    }

    fn generate_temp_name() -> String {
        format!("tmp-obj-{}", rand::random::<u32>())
    }

    /// Find all objects whose id starts with the given hex prefix.
    ///
    /// Prefixes of two or more characters only scan one fan-out directory.
    pub fn find_objects_by_prefix(&self, prefix: &str) -> DiffResult<Vec<ObjectId>> {
        let prefix = prefix.to_ascii_lowercase();
        let mut matches = Vec::new();

        let dirs = if prefix.len() >= 2 {
            vec![prefix[..2].to_string()]
        } else {
            (0..=255u8).map(|i| format!("{i:02x}")).collect()
        };

        for dir_name in dirs {
            let dir_path = self.path.join(&dir_name);
            if !dir_path.is_dir() {
                continue;
            }

            for entry in std::fs::read_dir(&dir_path)? {
                let file_name = entry?.file_name();
                let full_oid = format!("{}{}", dir_name, file_name.to_string_lossy());

                if full_oid.starts_with(&prefix)
                    && let Ok(oid) = ObjectId::try_parse(full_oid)
                {
                    matches.push(oid);
                }
            }
        }

        matches.sort();
        Ok(matches)
    }
}

/// In-memory directory node used by [`Database::write_snapshot`]
#[derive(Debug, Default)]
struct SnapshotNode {
    files: BTreeMap<String, (ObjectId, FileMode)>,
    dirs: BTreeMap<String, SnapshotNode>,
}

impl SnapshotNode {
    fn insert(&mut self, path: &str, oid: ObjectId, mode: FileMode) -> DiffResult<()> {
        let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();
        let mut node = self;

        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                if node.dirs.contains_key(segment)
                    || node.files.insert(segment.to_string(), (oid, mode)).is_some()
                {
                    return Err(DiffError::DuplicateTreeEntry {
                        name: path.to_string(),
                    });
                }
                return Ok(());
            }

            if node.files.contains_key(segment) {
                return Err(DiffError::DuplicateTreeEntry {
                    name: path.to_string(),
                });
            }
            node = node.dirs.entry(segment.to_string()).or_default();
        }

        Err(DiffError::InvalidPathSegment {
            name: path.to_string(),
        })
    }

    fn store(self, database: &Database) -> DiffResult<ObjectId> {
        let mut tree = Tree::new();

        for (name, (oid, mode)) in self.files {
            tree.add_entry(&name, oid, mode.into())?;
        }
        for (name, dir) in self.dirs {
            let oid = dir.store(database)?;
            tree.add_entry(&name, oid, EntryMode::Directory)?;
        }

        database.store(&tree)
    }
}

/// Memoized slim commits for one ancestry walk
#[derive(Debug, Default)]
pub struct CommitCache {
    commits: RefCell<HashMap<ObjectId, SlimCommit>>,
}

impl CommitCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load_slim_commit(
        &self,
        database: &Database,
        oid: &ObjectId,
    ) -> DiffResult<SlimCommit> {
        if let Some(commit) = self.commits.borrow().get(oid) {
            return Ok(commit.clone());
        }

        let commit = database.parse_object_as_commit(oid)?.to_slim(oid.clone());
        self.commits
            .borrow_mut()
            .insert(oid.clone(), commit.clone());

        Ok(commit)
    }

    pub fn len(&self) -> usize {
        self.commits.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.borrow().is_empty()
    }
}
