use crate::common::file::FileSpec;
use assert_fs::TempDir;
use chrono::{DateTime, FixedOffset};
use mergediff::areas::repository::Repository;
use mergediff::artifacts::branch::branch_name::BranchName;
use mergediff::artifacts::objects::commit::{Author, Commit};
use mergediff::artifacts::objects::object_id::ObjectId;
use std::cell::Cell;

/// Writes commits straight into a fresh repository's object store
pub struct History {
    pub dir: TempDir,
    pub repository: Repository,
    clock: Cell<i64>,
}

impl History {
    pub fn new(dir: TempDir) -> Self {
        let repository = Repository::init(dir.path()).expect("Failed to init repository");

        History {
            dir,
            repository,
            clock: Cell::new(1_700_000_000),
        }
    }

    /// Store a commit of exactly `files`; every commit is one minute newer
    /// than the previous one
    pub fn commit(&self, parents: &[&ObjectId], files: &[FileSpec], message: &str) -> ObjectId {
        let database = self.repository.database();
        let tree = database
            .write_snapshot(
                files
                    .iter()
                    .map(|f| (f.path.clone(), f.content.clone())),
            )
            .expect("Failed to write snapshot");

        let seconds = self.clock.get() + 60;
        self.clock.set(seconds);
        let timestamp = DateTime::from_timestamp(seconds, 0)
            .expect("valid timestamp")
            .with_timezone(&FixedOffset::east_opt(0).expect("valid offset"));
        let author = Author::new_with_timestamp(
            "Test Author".to_string(),
            "test@example.com".to_string(),
            timestamp,
        );

        database
            .store(&Commit::new(
                parents.iter().map(|&p| p.clone()).collect(),
                tree,
                author,
                message.to_string(),
            ))
            .expect("Failed to store commit")
    }

    pub fn branch(&self, name: &str, oid: &ObjectId) {
        self.repository
            .refs()
            .create_branch(&branch_name(name), oid)
            .expect("Failed to create branch");
    }

    pub fn checkout(&self, name: &str) {
        self.repository
            .refs()
            .set_head(&branch_name(name))
            .expect("Failed to set HEAD");
    }
}

fn branch_name(name: &str) -> BranchName {
    BranchName::try_parse(name.to_string()).expect("valid branch name")
}

impl History {
    pub fn into_parts(self) -> (TempDir, Repository) {
        (self.dir, self.repository)
    }
}
