use crate::areas::repository::Repository;
use crate::artifacts::branch::revision::resolve_revision;
use crate::artifacts::core::error::DiffResult;
use crate::artifacts::merge::merge_base::{MergeBaseStrategy, merge_base};
use crate::artifacts::objects::object_id::ObjectId;

impl Repository {
    /// Merge base of two revisions
    pub fn find_merge_base(
        &self,
        left: &str,
        right: &str,
        strategy: MergeBaseStrategy,
    ) -> DiffResult<ObjectId> {
        let left_oid = resolve_revision(self, left)?;
        let right_oid = resolve_revision(self, right)?;

        tracing::info!(
            left,
            right,
            %strategy,
            "searching merge base"
        );
        merge_base(self.database(), &left_oid, &right_oid, strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::branch::branch_name::BranchName;
    use crate::artifacts::core::error::DiffError;
    use crate::artifacts::objects::commit::{Author, Commit};
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn commit(repository: &Repository, parents: Vec<ObjectId>, content: &'static str) -> ObjectId {
        let database = repository.database();
        let tree = database.write_snapshot([("file.txt", content)]).unwrap();
        let author = Author::new("Test".to_string(), "test@example.com".to_string());
        database
            .store(&Commit::new(parents, tree, author, content.to_string()))
            .unwrap()
    }

    #[rstest]
    #[case(MergeBaseStrategy::Best)]
    #[case(MergeBaseStrategy::Bfs)]
    fn finds_fork_point_of_named_branches(#[case] strategy: MergeBaseStrategy) {
        let dir = TempDir::new().unwrap();
        let repository = Repository::init(dir.path()).unwrap();
        let a = commit(&repository, vec![], "a");
        let b = commit(&repository, vec![a.clone()], "b");
        let c = commit(&repository, vec![b], "c");
        let d = commit(&repository, vec![a.clone()], "d");
        for (name, oid) in [("main", &c), ("topic", &d)] {
            repository
                .refs()
                .create_branch(&BranchName::try_parse(name.to_string()).unwrap(), oid)
                .unwrap();
        }

        assert_eq!(repository.find_merge_base("main", "topic", strategy).unwrap(), a);
        assert_eq!(repository.find_merge_base("main", "main", strategy).unwrap(), c);
    }

    #[test]
    fn unknown_revision_is_reported_by_name() {
        let dir = TempDir::new().unwrap();
        let repository = Repository::init(dir.path()).unwrap();

        assert!(matches!(
            repository.find_merge_base("nope", "HEAD", MergeBaseStrategy::Best),
            Err(DiffError::UnknownRef { name }) if name == "nope"
        ));
    }
}
