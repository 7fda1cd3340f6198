use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::{ANCESTOR_REGEX, PARENT_REGEX, REF_ALIASES};
use crate::artifacts::core::error::{DiffError, DiffResult};
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;

/// Minimum length of an abbreviated object id
const MIN_OID_PREFIX: usize = 4;

/// A revision expression naming a commit.
///
/// Supported forms:
/// - ref names: `main`, `v1.0`, `origin/main`, `refs/heads/main`, `HEAD`
/// - `@` as an alias for `HEAD`
/// - full or abbreviated (at least 4 hex digits) object ids, tried only when
///   no ref of that name exists
/// - `<rev>^` for the first parent and `<rev>~<n>` for the n-th first-parent
///   ancestor
#[derive(Debug, Clone)]
pub enum Revision {
    Ref(BranchName),
    Ancestor(Box<Revision>, usize),
    Parent(Box<Revision>),
}

/// Resolve `name` to a commit id.
///
/// Anything that does not name an existing commit is `UnknownRef`; a name
/// that resolves to a tree or blob is `UnexpectedObjectType`.
pub fn resolve_revision(repository: &Repository, name: &str) -> DiffResult<ObjectId> {
    let unknown = || DiffError::UnknownRef {
        name: name.to_string(),
    };

    let revision = Revision::try_parse(name).map_err(|e| {
        tracing::debug!(revision = name, error = %e, "unparseable revision");
        unknown()
    })?;
    let oid = revision.resolve(repository)?.ok_or_else(unknown)?;

    match repository.database().get_object_type(&oid)? {
        ObjectType::Commit => Ok(oid),
        actual => Err(DiffError::UnexpectedObjectType {
            oid,
            expected: ObjectType::Commit,
            actual,
        }),
    }
}

impl Revision {
    /// `Ok(None)` when the expression is well formed but names nothing,
    /// e.g. a missing branch or the parent of a root commit.
    pub fn resolve(&self, repository: &Repository) -> DiffResult<Option<ObjectId>> {
        match self {
            Revision::Ref(branch_name) => match repository.refs().read_ref(branch_name)? {
                Some(oid) => Ok(Some(oid)),
                None if Self::looks_like_oid(branch_name.as_ref()) => {
                    Self::resolve_oid(branch_name.as_ref(), repository)
                }
                None => Ok(None),
            },
            Revision::Parent(base_revision) => {
                Self::resolve_commit_parent(base_revision.resolve(repository)?, repository)
            }
            Revision::Ancestor(base_revision, generations) => {
                let mut oid = base_revision.resolve(repository)?;
                for _ in 0..*generations {
                    oid = Self::resolve_commit_parent(oid, repository)?;
                }

                Ok(oid)
            }
        }
    }

    fn resolve_commit_parent(
        oid: Option<ObjectId>,
        repository: &Repository,
    ) -> DiffResult<Option<ObjectId>> {
        match oid {
            Some(oid) => {
                let commit = repository.database().parse_object_as_commit(&oid)?;
                Ok(commit.parent().cloned())
            }
            None => Ok(None),
        }
    }

    fn resolve_oid(oid_str: &str, repository: &Repository) -> DiffResult<Option<ObjectId>> {
        let database = repository.database();

        if oid_str.len() == OBJECT_ID_LENGTH {
            return Ok(ObjectId::try_parse(oid_str.to_string())
                .ok()
                .filter(|oid| database.contains(oid)));
        }

        let commits = database
            .find_objects_by_prefix(oid_str)?
            .into_iter()
            .filter(|oid| {
                database
                    .get_object_type(oid)
                    .is_ok_and(|object_type| object_type == ObjectType::Commit)
            })
            .collect::<Vec<_>>();

        match commits.as_slice() {
            [] => Ok(None),
            [oid] => Ok(Some(oid.clone())),
            candidates => {
                tracing::debug!(
                    prefix = oid_str,
                    candidates = ?candidates.iter().map(ObjectId::to_short_oid).collect::<Vec<_>>(),
                    "ambiguous abbreviated object id"
                );
                Err(DiffError::UnknownRef {
                    name: oid_str.to_string(),
                })
            }
        }
    }

    pub fn try_parse(revision: &str) -> anyhow::Result<Revision> {
        let parent_regex = regex::Regex::new(PARENT_REGEX)
            .with_context(|| format!("invalid parent regex: {PARENT_REGEX}"))?;
        let ancestor_regex = regex::Regex::new(ANCESTOR_REGEX)
            .with_context(|| format!("invalid ancestor regex: {ANCESTOR_REGEX}"))?;

        if let Some(caps) = parent_regex.captures(revision) {
            let base_revision = Self::try_parse(&caps[1])?;

            Ok(Revision::Parent(Box::new(base_revision)))
        } else if let Some(caps) = ancestor_regex.captures(revision) {
            let generations: usize = caps[2]
                .parse()
                .with_context(|| format!("failed to parse generations in revision: {revision}"))?;
            let base_revision = Self::try_parse(&caps[1])?;

            Ok(Revision::Ancestor(Box::new(base_revision), generations))
        } else {
            let resolved_name = *REF_ALIASES.get(revision).unwrap_or(&revision);
            let branch_name = BranchName::try_parse(resolved_name.to_string())?;
            Ok(Revision::Ref(branch_name))
        }
    }

    fn looks_like_oid(s: &str) -> bool {
        (MIN_OID_PREFIX..=OBJECT_ID_LENGTH).contains(&s.len())
            && s.chars().all(|c| c.is_ascii_hexdigit())
    }
}
