//! References (branches, tags, remotes, HEAD)
//!
//! References are human-readable names pointing to commits. A ref file holds
//! either a 40-character object id or `ref: <path>` for a symbolic ref.
//! Refs that have been packed live as `<oid> <refname>` lines in
//! `packed-refs`.
//!
//! Lookup order for a short name mirrors the usual VCS rules:
//! `<name>`, `refs/<name>`, `refs/heads/<name>`, `refs/tags/<name>`,
//! `refs/remotes/<name>`, `refs/remotes/<name>/HEAD`, then `packed-refs`.

use crate::artifacts::branch::branch_name::{BranchName, SymRefName};
use crate::artifacts::core::error::{DiffError, DiffResult};
use crate::artifacts::objects::object_id::ObjectId;
use derive_new::new;
use file_guard::Lock;
use std::io::Write;
use std::ops::DerefMut;
use std::path::{Path, PathBuf};

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

const SYMREF_PREFIX: &str = "ref: ";
const HEADS_PREFIX: &str = "refs/heads/";
const PACKED_REFS: &str = "packed-refs";

/// Maximum number of symbolic hops before a ref is considered cyclic
const MAX_SYMREF_DEPTH: usize = 10;

/// Reference store rooted at the `.git` directory
#[derive(Debug, new)]
pub struct Refs {
    path: Box<Path>,
}

#[derive(Debug, Clone)]
enum SymRefOrOid {
    SymRef { sym_ref_name: SymRefName },
    Oid(ObjectId),
}

impl SymRefOrOid {
    fn read_symref_or_oid(path: &Path) -> DiffResult<Option<SymRefOrOid>> {
        if !path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        let content = content.trim();

        if content.is_empty() {
            return Ok(None);
        }

        if let Some(target) = content.strip_prefix(SYMREF_PREFIX) {
            Ok(Some(SymRefOrOid::SymRef {
                sym_ref_name: SymRefName::new(target.trim().to_string()),
            }))
        } else {
            ObjectId::try_parse(content.to_string())
                .map(|oid| Some(SymRefOrOid::Oid(oid)))
                .map_err(|_| DiffError::UnknownRef {
                    name: path.display().to_string(),
                })
        }
    }
}

impl Refs {
    /// Follow HEAD (or `source`) through symbolic refs to the final ref name
    ///
    /// Returns the last name in the chain, e.g. `refs/heads/main`, or `HEAD`
    /// itself when detached.
    pub fn current_ref(&self, source: Option<SymRefName>) -> DiffResult<SymRefName> {
        let mut current = source.unwrap_or_else(|| SymRefName::new(HEAD_REF_NAME.to_string()));

        for _ in 0..MAX_SYMREF_DEPTH {
            let path = self.path.join(current.as_ref_path());
            match SymRefOrOid::read_symref_or_oid(&path)? {
                Some(SymRefOrOid::SymRef { sym_ref_name }) => current = sym_ref_name,
                Some(SymRefOrOid::Oid(_)) | None => return Ok(current),
            }
        }

        Err(DiffError::UnknownRef {
            name: current.as_ref_path().to_string(),
        })
    }

    /// Short name of the checked-out branch, `HEAD` when detached
    pub fn head_shorthand(&self) -> DiffResult<String> {
        let current = self.current_ref(None)?;
        let name = current.as_ref_path();

        Ok(name.strip_prefix(HEADS_PREFIX).unwrap_or(name).to_string())
    }

    pub fn read_head(&self) -> DiffResult<Option<ObjectId>> {
        self.read_symref(&self.head_path())
    }

    /// Resolve a ref name to the object id it points at
    ///
    /// `Ok(None)` means no ref of that name exists, or it is an unborn branch.
    pub fn read_ref(&self, branch_name: &BranchName) -> DiffResult<Option<ObjectId>> {
        let name = branch_name.as_ref();

        for path in self.candidate_paths(name) {
            if path.is_file() {
                return self.read_symref(&path);
            }
        }

        self.read_packed_ref(name)
    }

    /// Read a ref file, following symbolic refs to a direct id
    fn read_symref(&self, path: &Path) -> DiffResult<Option<ObjectId>> {
        let mut path = path.to_path_buf();

        for _ in 0..MAX_SYMREF_DEPTH {
            match SymRefOrOid::read_symref_or_oid(&path)? {
                Some(SymRefOrOid::SymRef { sym_ref_name }) => {
                    let target = self.path.join(sym_ref_name.as_ref_path());
                    if !target.is_file() {
                        return self.read_packed_ref(sym_ref_name.as_ref_path());
                    }
                    path = target;
                }
                Some(SymRefOrOid::Oid(oid)) => return Ok(Some(oid)),
                None => return Ok(None),
            }
        }

        Err(DiffError::UnknownRef {
            name: path.display().to_string(),
        })
    }

    fn candidate_paths(&self, name: &str) -> Vec<PathBuf> {
        let refs_path = self.refs_path();
        let mut paths = Vec::with_capacity(6);

        // only pseudo-refs such as HEAD live directly in the repository dir
        if name.starts_with("refs/") || name.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
            paths.push(self.path.join(name));
        }
        paths.extend([
            refs_path.join(name),
            refs_path.join("heads").join(name),
            refs_path.join("tags").join(name),
            refs_path.join("remotes").join(name),
            refs_path.join("remotes").join(name).join(HEAD_REF_NAME),
        ]);

        paths
    }

    /// Look `name` up in `packed-refs`, trying the same prefixes as loose refs
    fn read_packed_ref(&self, name: &str) -> DiffResult<Option<ObjectId>> {
        let packed_path = self.path.join(PACKED_REFS);
        if !packed_path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&packed_path)?;
        let packed = content
            .lines()
            .filter(|line| !line.starts_with('#') && !line.starts_with('^'))
            .filter_map(|line| line.split_once(' '))
            .collect::<Vec<_>>();

        let candidates = [
            name.to_string(),
            format!("refs/{name}"),
            format!("refs/heads/{name}"),
            format!("refs/tags/{name}"),
            format!("refs/remotes/{name}"),
            format!("refs/remotes/{name}/HEAD"),
        ];

        for candidate in &candidates {
            if let Some((oid, _)) = packed.iter().find(|(_, refname)| refname == candidate) {
                let oid = ObjectId::try_parse(oid.to_string()).map_err(|_| {
                    DiffError::UnknownRef {
                        name: candidate.clone(),
                    }
                })?;
                return Ok(Some(oid));
            }
        }

        Ok(None)
    }

    /// Write `raw_ref` to a ref file under an exclusive lock
    pub fn update_ref_file(&self, path: &Path, raw_ref: String) -> DiffResult<()> {
        let parent = path.parent().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid ref path {}", path.display()),
            )
        })?;
        std::fs::create_dir_all(parent)?;

        let mut ref_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let mut lock = file_guard::lock(&mut ref_file, Lock::Exclusive, 0, 1)?;
        lock.deref_mut().write_all(raw_ref.as_bytes())?;

        Ok(())
    }

    /// Point a full ref name (e.g. `refs/tags/v1`) at `oid`
    pub fn update_ref(&self, ref_name: &str, oid: &ObjectId) -> DiffResult<()> {
        self.update_ref_file(&self.path.join(ref_name), format!("{oid}\n"))
    }

    pub fn create_branch(&self, name: &BranchName, source_oid: &ObjectId) -> DiffResult<()> {
        self.update_ref(&format!("{HEADS_PREFIX}{name}"), source_oid)
    }

    /// Attach HEAD to a branch, which need not exist yet
    pub fn set_head(&self, branch: &BranchName) -> DiffResult<()> {
        self.update_ref_file(
            &self.head_path(),
            format!("{SYMREF_PREFIX}{HEADS_PREFIX}{branch}\n"),
        )
    }

    pub fn detach_head(&self, oid: &ObjectId) -> DiffResult<()> {
        self.update_ref_file(&self.head_path(), format!("{oid}\n"))
    }

    pub fn head_path(&self) -> PathBuf {
        self.path.join(HEAD_REF_NAME)
    }

    pub fn refs_path(&self) -> PathBuf {
        self.path.join("refs")
    }

    pub fn heads_path(&self) -> PathBuf {
        self.refs_path().join("heads")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;
    use proptest::proptest;
    use rstest::{fixture, rstest};

    fn oid(c: char) -> ObjectId {
        ObjectId::try_parse(c.to_string().repeat(40)).unwrap()
    }

    fn name(raw: &str) -> BranchName {
        BranchName::try_parse(raw.to_string()).unwrap()
    }

    #[fixture]
    fn refs() -> (TempDir, Refs) {
        let dir = TempDir::new().unwrap();
        let refs = Refs::new(dir.path().to_path_buf().into_boxed_path());
        refs.set_head(&name("main")).unwrap();
        (dir, refs)
    }

    #[rstest]
    fn resolves_branches_tags_and_remotes(refs: (TempDir, Refs)) {
        let (_dir, refs) = refs;
        refs.create_branch(&name("main"), &oid('a')).unwrap();
        refs.update_ref("refs/tags/v1", &oid('b')).unwrap();
        refs.update_ref("refs/remotes/origin/main", &oid('c')).unwrap();

        assert_eq!(refs.read_ref(&name("main")).unwrap(), Some(oid('a')));
        assert_eq!(refs.read_ref(&name("refs/heads/main")).unwrap(), Some(oid('a')));
        assert_eq!(refs.read_ref(&name("v1")).unwrap(), Some(oid('b')));
        assert_eq!(refs.read_ref(&name("origin/main")).unwrap(), Some(oid('c')));
        assert_eq!(refs.read_ref(&name("HEAD")).unwrap(), Some(oid('a')));
        assert_eq!(refs.read_ref(&name("missing")).unwrap(), None);
    }

    #[rstest]
    fn branches_shadow_tags_of_the_same_name(refs: (TempDir, Refs)) {
        let (_dir, refs) = refs;
        refs.create_branch(&name("release"), &oid('a')).unwrap();
        refs.update_ref("refs/tags/release", &oid('b')).unwrap();

        assert_eq!(refs.read_ref(&name("release")).unwrap(), Some(oid('a')));
    }

    #[rstest]
    fn reads_packed_refs(refs: (TempDir, Refs)) {
        let (dir, refs) = refs;
        std::fs::write(
            dir.path().join(PACKED_REFS),
            format!(
                "# pack-refs with: peeled fully-peeled sorted\n{} refs/heads/main\n{} refs/tags/v2\n^{}\n",
                oid('d'),
                oid('e'),
                oid('f')
            ),
        )
        .unwrap();

        assert_eq!(refs.read_ref(&name("v2")).unwrap(), Some(oid('e')));
        // HEAD points at a branch that only exists packed
        assert_eq!(refs.read_head().unwrap(), Some(oid('d')));
    }

    #[rstest]
    fn head_shorthand_names_branch_or_detached_head(refs: (TempDir, Refs)) {
        let (_dir, refs) = refs;
        assert_eq!(refs.head_shorthand().unwrap(), "main");
        assert_eq!(refs.read_head().unwrap(), None);

        refs.detach_head(&oid('a')).unwrap();
        assert_eq!(refs.head_shorthand().unwrap(), "HEAD");
        assert_eq!(refs.read_head().unwrap(), Some(oid('a')));
    }

    #[rstest]
    fn garbage_ref_content_is_unknown(refs: (TempDir, Refs)) {
        let (dir, refs) = refs;
        std::fs::create_dir_all(dir.path().join("refs/heads")).unwrap();
        std::fs::write(dir.path().join("refs/heads/broken"), "not an id\n").unwrap();

        assert!(matches!(
            refs.read_ref(&name("broken")),
            Err(DiffError::UnknownRef { .. })
        ));
    }

    proptest! {
        #[test]
        fn test_is_valid_branch_name_with_valid_branch_name(
            branch_name in "[a-zA-Z0-9_-]+"
        ) {
            assert!(BranchName::try_parse(branch_name).is_ok());
        }

        #[test]
        fn test_is_valid_branch_name_with_slashes(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+"
        ) {
            let branch_name = format!("{}/{}", prefix, suffix);
            assert!(BranchName::try_parse(branch_name).is_ok());
        }

        #[test]
        fn test_is_invalid_branch_name_starting_with_dot(
            suffix in "[a-zA-Z0-9_-]+"
        ) {
            let branch_name = format!(".{}", suffix);
            assert!(BranchName::try_parse(branch_name).is_err());
        }

        #[test]
        fn test_is_invalid_branch_name_ending_with_lock(
            prefix in "[a-zA-Z0-9_-]+"
        ) {
            let branch_name = format!("{}.lock", prefix);
            assert!(BranchName::try_parse(branch_name).is_err());
        }

        #[test]
        fn test_is_invalid_branch_name_with_consecutive_dots(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+"
        ) {
            let branch_name = format!("{}..{}", prefix, suffix);
            assert!(BranchName::try_parse(branch_name).is_err());
        }

        #[test]
        fn test_is_invalid_branch_name_with_special_chars(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+",
            special_char in r"[\*:\?\[\\^~]"
        ) {
            let branch_name = format!("{}{}{}", prefix, special_char, suffix);
            assert!(BranchName::try_parse(branch_name).is_err());
        }
    }
}
