use crate::areas::database::Database;
use crate::areas::refs::Refs;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::core::error::{DiffError, DiffResult};
use std::path::Path;
use std::sync::Arc;

const GIT_DIR: &str = ".git";
const DEFAULT_BRANCH: &str = "master";

/// Read-only handle on a repository
///
/// Holds no per-query state, so one handle can serve concurrent queries.
#[derive(Debug)]
pub struct Repository {
    path: Box<Path>,
    database: Arc<Database>,
    refs: Refs,
}

impl Repository {
    fn open(work_dir: &Path) -> Self {
        let git_dir = work_dir.join(GIT_DIR);
        let database = Database::new(git_dir.join("objects").into_boxed_path());
        let refs = Refs::new(git_dir.into_boxed_path());

        Repository {
            path: work_dir.to_path_buf().into_boxed_path(),
            database: Arc::new(database),
            refs,
        }
    }

    /// Open the repository containing `path`, searching parent directories.
    pub fn discover(path: impl AsRef<Path>) -> DiffResult<Self> {
        let start = path.as_ref();
        let not_found = || DiffError::RepositoryNotFound {
            path: start.to_path_buf(),
        };
        let start_abs = start.canonicalize().map_err(|_| not_found())?;

        let work_dir = start_abs
            .ancestors()
            .find(|dir| dir.join(GIT_DIR).join("objects").is_dir())
            .ok_or_else(not_found)?;

        tracing::debug!(path = %work_dir.display(), "discovered repository");
        Ok(Self::open(work_dir))
    }

    /// Create an empty repository at `path` with HEAD on `master`.
    ///
    /// Re-initializing an existing repository leaves its refs untouched.
    pub fn init(path: impl AsRef<Path>) -> DiffResult<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let work_dir = path.canonicalize()?;

        let repository = Self::open(&work_dir);
        std::fs::create_dir_all(repository.database.objects_path())?;
        std::fs::create_dir_all(repository.refs.heads_path())?;

        if !repository.refs.head_path().exists() {
            let default_branch = BranchName::try_parse(DEFAULT_BRANCH.to_string())
                .map_err(|_| DiffError::UnknownRef {
                    name: DEFAULT_BRANCH.to_string(),
                })?;
            repository.refs.set_head(&default_branch)?;
        }

        Ok(repository)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Shared handle for worker tasks
    pub fn shared_database(&self) -> Arc<Database> {
        Arc::clone(&self.database)
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use pretty_assertions::assert_eq;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn repository_can_be_shared_across_threads() {
        assert_send_sync::<Repository>();
    }

    #[test]
    fn init_lays_out_an_empty_repository() {
        let dir = TempDir::new().unwrap();

        let repository = Repository::init(dir.path()).unwrap();

        dir.child(".git/objects").assert(predicates::path::is_dir());
        dir.child(".git/refs/heads").assert(predicates::path::is_dir());
        dir.child(".git/HEAD")
            .assert("ref: refs/heads/master\n");
        assert_eq!(repository.refs().head_shorthand().unwrap(), "master");
    }

    #[test]
    fn discover_walks_up_from_nested_directories() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let nested = dir.child("src/deeply/nested");
        nested.create_dir_all().unwrap();

        let repository = Repository::discover(nested.path()).unwrap();

        assert_eq!(repository.path(), dir.path().canonicalize().unwrap());
    }

    #[test]
    fn discover_fails_outside_a_repository() {
        let dir = TempDir::new().unwrap();

        assert!(matches!(
            Repository::discover(dir.path()),
            Err(DiffError::RepositoryNotFound { path }) if path == dir.path()
        ));
    }
}
