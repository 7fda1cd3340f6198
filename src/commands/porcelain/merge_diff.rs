//! The diff query pipeline
//!
//! A query moves through `Idle → RefsResolved → BaseFound → TreesDiffed →
//! LinesDiffed → Assembled`. A failure at any step aborts the query with the
//! stage reached so far; no partial report is produced.

use crate::areas::database::Database;
use crate::areas::repository::Repository;
use crate::artifacts::branch::revision::resolve_revision;
use crate::artifacts::core::error::{DiffError, DiffResult, PipelineError, PipelineStage};
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::diff::tree_diff::{ChangeSet, TreeChangeType};
use crate::artifacts::diff::{DEFAULT_CONTEXT_LINES, diff_lines};
use crate::artifacts::merge::merge_base::{MergeBaseStrategy, merge_base};
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::report::{DiffReport, FileChange, assemble};
use derive_new::new;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Per-query settings
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct DiffOptions {
    pub context_lines: usize,
    /// Upper bound on files diffed at once
    pub jobs: usize,
    pub strategy: MergeBaseStrategy,
    pub timeout: Option<Duration>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        DiffOptions {
            context_lines: DEFAULT_CONTEXT_LINES,
            jobs: default_jobs(),
            strategy: MergeBaseStrategy::default(),
            timeout: None,
        }
    }
}

pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Tracks the current stage and the deadline of one query
struct Pipeline {
    stage: PipelineStage,
    deadline: Option<Instant>,
}

impl Pipeline {
    fn start(options: &DiffOptions) -> Self {
        Pipeline {
            stage: PipelineStage::Idle,
            deadline: options.timeout.map(|timeout| Instant::now() + timeout),
        }
    }

    /// Fail with `Timeout` if the deadline passed before the next stage
    fn check_deadline(&self) -> Result<(), PipelineError> {
        match (self.deadline, self.stage.next()) {
            (Some(deadline), Some(next)) if Instant::now() >= deadline => {
                tracing::warn!(stage = %self.stage, "deadline exceeded");
                Err(self.fail(DiffError::Timeout { stage: next }))
            }
            _ => Ok(()),
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.stage.next() {
            tracing::debug!(from = %self.stage, to = %next, "pipeline stage");
            self.stage = next;
        }
    }

    /// Run one step: deadline check, then the step, then move on
    fn step<T>(&mut self, run: impl FnOnce() -> DiffResult<T>) -> Result<T, PipelineError> {
        self.check_deadline()?;
        let value = run().map_err(|e| self.fail(e))?;
        self.advance();
        Ok(value)
    }

    fn fail(&self, error: DiffError) -> PipelineError {
        tracing::debug!(stage = %self.stage, %error, "pipeline failed");
        PipelineError::new(self.stage, error)
    }
}

impl Repository {
    /// Diff `source` (HEAD's branch when `None`) against its merge base with
    /// `target`.
    pub async fn compute_merge_diff(
        &self,
        target: &str,
        source: Option<&str>,
        options: &DiffOptions,
    ) -> Result<DiffReport, PipelineError> {
        let mut pipeline = Pipeline::start(options);

        let (source_name, source_oid, target_oid) = pipeline.step(|| {
            let source_name = match source {
                Some(source) => source.to_string(),
                None => self.refs().head_shorthand()?,
            };
            let source_oid = resolve_revision(self, &source_name)?;
            let target_oid = resolve_revision(self, target)?;
            Ok((source_name, source_oid, target_oid))
        })?;

        let base_oid = pipeline.step(|| {
            merge_base(self.database(), &source_oid, &target_oid, options.strategy)
        })?;

        tracing::info!(
            source = %source_name,
            target_ref = %target,
            base = %base_oid.to_short_oid(),
            "computing merge diff"
        );

        self.diff_from(pipeline, &source_name, target, base_oid, &source_oid, options)
            .await
    }

    /// Diff the tree of `from` against the tree of `to`, without a merge base
    pub async fn compute_commit_diff(
        &self,
        from: &str,
        to: &str,
        options: &DiffOptions,
    ) -> Result<DiffReport, PipelineError> {
        let mut pipeline = Pipeline::start(options);

        let (from_oid, to_oid) = pipeline.step(|| {
            Ok((resolve_revision(self, from)?, resolve_revision(self, to)?))
        })?;
        // the older side stands in for the merge base
        pipeline.step(|| Ok(()))?;

        self.diff_from(pipeline, from, to, from_oid, &to_oid, options)
            .await
    }

    async fn diff_from(
        &self,
        mut pipeline: Pipeline,
        source_label: &str,
        target_label: &str,
        base_oid: ObjectId,
        new_oid: &ObjectId,
        options: &DiffOptions,
    ) -> Result<DiffReport, PipelineError> {
        let changes = pipeline.step(|| {
            Ok(self
                .database()
                .tree_diff(Some(&base_oid), Some(new_oid))?
                .into_changes())
        })?;

        pipeline.check_deadline()?;
        let file_changes = diff_files(self.shared_database(), changes, options)
            .await
            .map_err(|e| pipeline.fail(e))?;
        pipeline.advance();

        pipeline.step(|| {
            Ok(assemble(source_label, target_label, base_oid, file_changes))
        })
    }
}

/// Line-diff every changed file on a bounded pool, keeping path order.
///
/// The first failure cancels the remaining files.
async fn diff_files(
    database: Arc<Database>,
    changes: ChangeSet,
    options: &DiffOptions,
) -> DiffResult<Vec<FileChange>> {
    let total = changes.len();
    let semaphore = Arc::new(Semaphore::new(options.jobs.max(1)));
    let mut tasks = JoinSet::new();
    let mut done = Vec::with_capacity(total);

    for (index, (path, change)) in changes.into_iter().enumerate() {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|e| DiffError::WorkerPool(e.to_string()))?;
        let database = Arc::clone(&database);
        let context = options.context_lines;

        tasks.spawn_blocking(move || {
            let _permit = permit;
            diff_file(&database, &path, &change, context).map(|file| (index, file))
        });

        // surface failures while still dispatching
        while let Some(joined) = tasks.try_join_next() {
            if let Err(e) = collect(joined, &mut done) {
                tasks.abort_all();
                return Err(e);
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = collect(joined, &mut done) {
            tasks.abort_all();
            return Err(e);
        }
    }
    // workers finish out of order
    done.sort_by_key(|(index, _)| *index);

    tracing::debug!(files = total, jobs = options.jobs, "line diffs finished");
    Ok(done.into_iter().map(|(_, file)| file).collect())
}

type Joined = Result<DiffResult<(usize, FileChange)>, tokio::task::JoinError>;

fn collect(joined: Joined, done: &mut Vec<(usize, FileChange)>) -> DiffResult<()> {
    let file = joined.map_err(|e| DiffError::WorkerPool(e.to_string()))??;
    done.push(file);
    Ok(())
}

fn diff_file(
    database: &Database,
    path: &Path,
    change: &TreeChangeType,
    context: usize,
) -> DiffResult<FileChange> {
    let old = side_text(database, change.old_entry())?;
    let new = side_text(database, change.new_entry())?;
    let hunks = diff_lines(&old, &new, context);

    tracing::trace!(
        path = %path.display(),
        status = %change.status_char(),
        hunks = hunks.len(),
        "diffed file"
    );
    Ok(FileChange::new(report_path(path), hunks))
}

/// Text of one side of a change; an absent side is empty
fn side_text(database: &Database, entry: Option<&DatabaseEntry>) -> DiffResult<String> {
    match entry {
        None => Ok(String::new()),
        Some(DatabaseEntry {
            oid,
            mode: EntryMode::Gitlink,
        }) => Ok(format!("Subproject commit {oid}\n")),
        Some(entry) => Ok(database.parse_object_as_blob(&entry.oid)?.text().into_owned()),
    }
}

/// Paths in reports always use `/`
fn report_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
