use crate::areas::database::{CommitCache, Database};
use crate::artifacts::core::error::{DiffError, DiffResult};
use crate::artifacts::merge::bca_finder::BCAFinder;
use crate::artifacts::objects::commit::SlimCommit;
use crate::artifacts::objects::object_id::ObjectId;
use std::collections::{HashSet, VecDeque};

/// How the merge base of two commits is chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum MergeBaseStrategy {
    /// Best common ancestor; criss-cross ties go to the newest commit
    #[default]
    Best,
    /// First ancestor of the second commit, in breadth-first order, that is
    /// also an ancestor of the first
    Bfs,
}

impl MergeBaseStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeBaseStrategy::Best => "best",
            MergeBaseStrategy::Bfs => "bfs",
        }
    }
}

impl std::fmt::Display for MergeBaseStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Find the merge base of two commits.
///
/// Fails with `NoCommonAncestor` when the histories are disjoint.
pub fn merge_base(
    database: &Database,
    left: &ObjectId,
    right: &ObjectId,
    strategy: MergeBaseStrategy,
) -> DiffResult<ObjectId> {
    let cache = CommitCache::new();
    let loader = |oid: &ObjectId| cache.get_or_load_slim_commit(database, oid);

    let base = match strategy {
        MergeBaseStrategy::Best => BCAFinder::new(loader).find_best_common_ancestor(left, right)?,
        MergeBaseStrategy::Bfs => breadth_first_merge_base(left, right, loader)?,
    };

    tracing::debug!(
        %left,
        %right,
        %strategy,
        base = ?base.as_ref().map(ObjectId::to_short_oid),
        commits_loaded = cache.len(),
        "merge base search finished"
    );

    base.ok_or_else(|| DiffError::NoCommonAncestor {
        left: left.clone(),
        right: right.clone(),
    })
}

fn breadth_first_merge_base<F>(
    left: &ObjectId,
    right: &ObjectId,
    commit_loader: F,
) -> DiffResult<Option<ObjectId>>
where
    F: Fn(&ObjectId) -> DiffResult<SlimCommit>,
{
    let left_ancestors = breadth_first(left, &commit_loader, |_| false)?.0;

    let (_, found) = breadth_first(right, &commit_loader, |oid| left_ancestors.contains(oid))?;
    Ok(found)
}

/// Visit `start` and its ancestors once each, in breadth-first order.
///
/// Stops at the first commit matching `stop_at` and returns it with the
/// commits visited so far.
fn breadth_first<F, P>(
    start: &ObjectId,
    commit_loader: &F,
    stop_at: P,
) -> DiffResult<(HashSet<ObjectId>, Option<ObjectId>)>
where
    F: Fn(&ObjectId) -> DiffResult<SlimCommit>,
    P: Fn(&ObjectId) -> bool,
{
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([start.clone()]);

    while let Some(oid) = queue.pop_front() {
        if !visited.insert(oid.clone()) {
            continue;
        }
        if stop_at(&oid) {
            return Ok((visited, Some(oid)));
        }

        let commit = commit_loader(&oid)?;
        queue.extend(
            commit
                .parents
                .into_iter()
                .filter(|parent| !visited.contains(parent)),
        );
    }

    Ok((visited, None))
}
