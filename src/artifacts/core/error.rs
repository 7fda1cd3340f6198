//! Error taxonomy for the diff pipeline
//!
//! Every failure raised by the object store, the commit graph navigator or the
//! differs is a [`DiffError`]. The pipeline driver wraps it in a
//! [`PipelineError`] that also records the stage the query was in.

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use std::path::PathBuf;
use thiserror::Error;

/// Stages of a single diff query, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineStage {
    Idle,
    RefsResolved,
    BaseFound,
    TreesDiffed,
    LinesDiffed,
    Assembled,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::RefsResolved => "refs-resolved",
            PipelineStage::BaseFound => "base-found",
            PipelineStage::TreesDiffed => "trees-diffed",
            PipelineStage::LinesDiffed => "lines-diffed",
            PipelineStage::Assembled => "assembled",
        }
    }

    /// The stage a successful step moves to, `None` once assembled.
    pub fn next(&self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Idle => Some(PipelineStage::RefsResolved),
            PipelineStage::RefsResolved => Some(PipelineStage::BaseFound),
            PipelineStage::BaseFound => Some(PipelineStage::TreesDiffed),
            PipelineStage::TreesDiffed => Some(PipelineStage::LinesDiffed),
            PipelineStage::LinesDiffed => Some(PipelineStage::Assembled),
            PipelineStage::Assembled => None,
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors raised by the object store, ref resolution, merge-base search and diffing.
#[derive(Debug, Error)]
pub enum DiffError {
    #[error("repository not found at or above {}", path.display())]
    RepositoryNotFound { path: PathBuf },

    #[error("unknown revision '{name}'")]
    UnknownRef { name: String },

    #[error("no common ancestor between {left} and {right}")]
    NoCommonAncestor { left: ObjectId, right: ObjectId },

    #[error("object {oid} not found")]
    ObjectNotFound { oid: ObjectId },

    #[error("malformed object {oid}: {reason}")]
    MalformedObject { oid: ObjectId, reason: String },

    #[error("object {oid} is a {actual}, expected a {expected}")]
    UnexpectedObjectType {
        oid: ObjectId,
        expected: ObjectType,
        actual: ObjectType,
    },

    #[error("duplicate tree entry '{name}'")]
    DuplicateTreeEntry { name: String },

    #[error("invalid path segment '{name}'")]
    InvalidPathSegment { name: String },

    #[error("deadline exceeded before stage {stage}")]
    Timeout { stage: PipelineStage },

    #[error("worker pool failure: {0}")]
    WorkerPool(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DiffError {
    /// Wrap a codec failure for the given object.
    pub fn malformed(oid: &ObjectId, reason: impl std::fmt::Display) -> Self {
        DiffError::MalformedObject {
            oid: oid.clone(),
            reason: reason.to_string(),
        }
    }
}

/// A [`DiffError`] tagged with the pipeline stage it aborted.
#[derive(Debug, Error)]
#[error("{stage}: {source}")]
pub struct PipelineError {
    /// The last stage that completed before the failure.
    pub stage: PipelineStage,
    #[source]
    pub source: DiffError,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, source: DiffError) -> Self {
        Self { stage, source }
    }

    pub fn error(&self) -> &DiffError {
        &self.source
    }
}

pub type DiffResult<T> = Result<T, DiffError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn stages_advance_in_order_and_stop_after_assembly() {
        let mut stage = PipelineStage::Idle;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            seen.push(next);
            stage = next;
        }

        assert_eq!(seen.len(), 6);
        assert_eq!(stage, PipelineStage::Assembled);
    }

    #[test]
    fn pipeline_error_names_stage_and_cause() {
        let error = PipelineError::new(
            PipelineStage::Idle,
            DiffError::UnknownRef {
                name: "feature".to_string(),
            },
        );

        assert_eq!(error.to_string(), "idle: unknown revision 'feature'");
        assert!(matches!(error.error(), DiffError::UnknownRef { name } if name == "feature"));
    }
}
