//! Best common ancestor search
//!
//! The merge base of two commits is the commit their changes are measured
//! against. This module finds it with a two-phase algorithm.
//!
//! ### Phase 1: find all common ancestors
//!
//! A bidirectional walk explores both histories at once:
//! - commits are popped newest first (by committer timestamp)
//! - every commit remembers whether it was reached from the source, the
//!   target, or both
//! - a commit reached from both sides is a common ancestor
//! - parents of a common ancestor are marked STALE, which prunes the walk
//!
//! ### Phase 2: keep only the best ones
//!
//! > A best common ancestor of X and Y is a common ancestor of X and Y that is
//! > not an ancestor of any other common ancestor.
//!
//! Each candidate is walked against the others; candidates reachable from
//! another candidate are dropped.
//!
//! Criss-cross histories can leave several best common ancestors. They are
//! ordered newest first, then by smallest id, so the chosen one does not
//! depend on the argument order.

use crate::artifacts::core::error::DiffResult;
use crate::artifacts::objects::commit::SlimCommit;
use crate::artifacts::objects::object_id::ObjectId;
use bitflags::bitflags;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    struct VisitState: u8 {
        const NONE = 0b00;
        const VISITED_FROM_SOURCE = 0b01;
        const VISITED_FROM_TARGET = 0b10;
        const VISITED_FROM_BOTH = Self::VISITED_FROM_SOURCE.bits() | Self::VISITED_FROM_TARGET.bits();
        const STALE = 0b100;
        const RESULT = 0b1000;
    }
}

impl fmt::Debug for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (VisitState::VISITED_FROM_SOURCE, "SOURCE"),
            (VisitState::VISITED_FROM_TARGET, "TARGET"),
            (VisitState::STALE, "STALE"),
            (VisitState::RESULT, "RESULT"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect::<Vec<_>>();

        if flags.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", flags.join("|"))
        }
    }
}

impl fmt::Display for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Phase 1 of the search, generic over how commits are loaded
#[derive(Debug, Clone)]
struct CommonAncestorsFinder<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> DiffResult<SlimCommit>,
{
    commit_loader: CommitLoaderFn,
}

impl<CommitLoaderFn> CommonAncestorsFinder<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> DiffResult<SlimCommit>,
{
    fn new(commit_loader: CommitLoaderFn) -> Self {
        Self { commit_loader }
    }

    /// Walk from `source_commit_id` and all `target_commit_ids` at once.
    ///
    /// Returns the visit state of every non-stale common ancestor.
    fn find_common_ancestors(
        &self,
        source_commit_id: &ObjectId,
        target_commit_ids: HashSet<&ObjectId>,
    ) -> DiffResult<HashMap<ObjectId, VisitState>> {
        if target_commit_ids.contains(source_commit_id) {
            return Ok(HashMap::from([(
                source_commit_id.clone(),
                VisitState::RESULT | VisitState::VISITED_FROM_BOTH,
            )]));
        }

        let mut ancestors_states = HashMap::<ObjectId, VisitState>::new();
        let mut priority_queue = BinaryHeap::new();

        let source_commit = (self.commit_loader)(source_commit_id)?;
        ancestors_states.insert(source_commit.oid.clone(), VisitState::VISITED_FROM_SOURCE);
        priority_queue.push((source_commit.timestamp, source_commit.oid));

        for &target_commit_id in target_commit_ids.iter() {
            ancestors_states.insert(target_commit_id.clone(), VisitState::VISITED_FROM_TARGET);

            let target_commit = (self.commit_loader)(target_commit_id)?;
            priority_queue.push((target_commit.timestamp, target_commit.oid));
        }

        while let Some((_, commit_id)) = priority_queue.pop() {
            let current_state = ancestors_states
                .get(&commit_id)
                .copied()
                .unwrap_or(VisitState::NONE);

            tracing::trace!(commit = %commit_id, state = %current_state, "visiting commit");

            if current_state.contains(VisitState::STALE) {
                continue;
            }

            let is_common_ancestor = current_state.contains(VisitState::VISITED_FROM_BOTH);
            if is_common_ancestor {
                ancestors_states
                    .entry(commit_id.clone())
                    .and_modify(|state| *state |= VisitState::RESULT);
            }

            let current_commit = (self.commit_loader)(&commit_id)?;

            for parent_id in current_commit.parents {
                let parent_state = ancestors_states
                    .get(&parent_id)
                    .copied()
                    .unwrap_or(VisitState::NONE);

                let mut new_state = parent_state | current_state;
                if is_common_ancestor {
                    new_state |= VisitState::STALE;
                }

                // requeue only when this side has news for the parent
                if !parent_state.contains(current_state) {
                    let parent_commit = (self.commit_loader)(&parent_id)?;
                    ancestors_states.insert(parent_id.clone(), new_state);
                    priority_queue.push((parent_commit.timestamp, parent_id));
                }
            }
        }

        Ok(ancestors_states
            .into_iter()
            .filter(|(_, state)| {
                !state.contains(VisitState::STALE) && state.contains(VisitState::RESULT)
            })
            .collect())
    }
}

/// Best common ancestor finder
pub struct BCAFinder<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> DiffResult<SlimCommit>,
{
    inner: CommonAncestorsFinder<CommitLoaderFn>,
}

impl<CommitLoaderFn> BCAFinder<CommitLoaderFn>
where
    CommitLoaderFn: Fn(&ObjectId) -> DiffResult<SlimCommit>,
{
    /// `commit_loader` returns the parents and committer timestamp of a commit.
    /// Any error it returns aborts the search.
    pub fn new(commit_loader: CommitLoaderFn) -> Self {
        Self {
            inner: CommonAncestorsFinder::new(commit_loader),
        }
    }

    /// All best common ancestors, newest first, ties broken by smallest id
    pub fn find_best_common_ancestors(
        &self,
        source_commit_id: &ObjectId,
        target_commit_id: &ObjectId,
    ) -> DiffResult<Vec<ObjectId>> {
        let common_ancestors = self
            .inner
            .find_common_ancestors(source_commit_id, HashSet::from([target_commit_id]))?
            .into_keys()
            .collect::<HashSet<_>>();

        if common_ancestors.is_empty() {
            return Ok(Vec::new());
        }

        tracing::trace!(count = common_ancestors.len(), "found common ancestors");

        let mut redundant_ancestors = HashSet::<ObjectId>::new();
        for commit in &common_ancestors {
            if redundant_ancestors.contains(commit) {
                continue;
            }

            let others = common_ancestors
                .iter()
                .filter(|other| *other != commit && !redundant_ancestors.contains(*other))
                .collect::<HashSet<_>>();
            if others.is_empty() {
                continue;
            }
            let common_states = self.inner.find_common_ancestors(commit, others.clone())?;

            if common_states
                .get(commit)
                .is_some_and(|state| state.contains(VisitState::VISITED_FROM_TARGET))
            {
                redundant_ancestors.insert(commit.clone());
            }

            for other in others {
                if common_states
                    .get(other)
                    .is_some_and(|state| state.contains(VisitState::VISITED_FROM_SOURCE))
                {
                    redundant_ancestors.insert(other.clone());
                }
            }
        }

        let mut best_common_ancestors = common_ancestors
            .into_iter()
            .filter(|commit| !redundant_ancestors.contains(commit))
            .map(|commit| (self.inner.commit_loader)(&commit))
            .collect::<DiffResult<Vec<_>>>()?;

        best_common_ancestors.sort_by(|left, right| {
            right
                .timestamp
                .cmp(&left.timestamp)
                .then_with(|| left.oid.cmp(&right.oid))
        });

        tracing::trace!(
            best = ?best_common_ancestors.iter().map(|c| c.oid.to_short_oid()).collect::<Vec<_>>(),
            redundant = redundant_ancestors.len(),
            "filtered common ancestors"
        );

        Ok(best_common_ancestors
            .into_iter()
            .map(|commit| commit.oid)
            .collect())
    }

    /// The preferred best common ancestor, `None` for unrelated histories
    pub fn find_best_common_ancestor(
        &self,
        source_commit_id: &ObjectId,
        target_commit_id: &ObjectId,
    ) -> DiffResult<Option<ObjectId>> {
        Ok(self
            .find_best_common_ancestors(source_commit_id, target_commit_id)?
            .into_iter()
            .next())
    }
}
