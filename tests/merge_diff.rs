use crate::common::command::repository_dir;
use crate::common::file::{FileSpec, with_file, without_file};
use crate::common::history::History;
use assert_fs::TempDir;
use mergediff::artifacts::core::error::{DiffError, PipelineStage};
use mergediff::artifacts::merge::merge_base::MergeBaseStrategy;
use mergediff::artifacts::report::DiffReport;
use mergediff::commands::porcelain::merge_diff::DiffOptions;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::Arc;

mod common;

fn file(path: &str, content: &str) -> FileSpec {
    FileSpec::new(path.to_string(), content.to_string())
}

fn paths(report: &DiffReport) -> Vec<&str> {
    report.changes.iter().map(|c| c.file_path.as_str()).collect()
}

fn options(strategy: MergeBaseStrategy) -> DiffOptions {
    DiffOptions {
        strategy,
        ..DiffOptions::default()
    }
}

/// History:
///       A (base)
///      / \
///     B   C
///     |   |
///   master  feature
///
/// Only the feature side of the fork is reported.
#[rstest]
#[tokio::test]
async fn merge_diff_of_simple_divergence(repository_dir: TempDir) {
    let history = History::new(repository_dir);
    let base_files = vec![
        file("base.txt", "base content\n"),
        file("left.txt", "initial\n"),
        file("right.txt", "initial\n"),
    ];
    let a = history.commit(&[], &base_files, "A");
    let b = history.commit(
        &[&a],
        &with_file(&base_files, file("left.txt", "initial\nmaster change\n")),
        "B",
    );
    let c = history.commit(
        &[&a],
        &with_file(&base_files, file("right.txt", "initial\nfeature change\n")),
        "C",
    );
    history.branch("master", &b);
    history.branch("feature", &c);

    let report = history
        .repository
        .compute_merge_diff("master", Some("feature"), &DiffOptions::default())
        .await
        .unwrap();

    assert_eq!(report.base_commit_id, a);
    assert_eq!(paths(&report), vec!["right.txt"]);
    let hunk = &report.changes[0].hunks[0];
    assert_eq!(hunk.header(), "@@ -1,1 +1,2 @@");
    assert_eq!(
        hunk.lines
            .iter()
            .map(|l| (l.origin.symbol(), l.content.as_str(), l.old_lineno, l.new_lineno))
            .collect::<Vec<_>>(),
        vec![
            (' ', "initial", Some(1), Some(1)),
            ('+', "feature change", None, Some(2)),
        ]
    );
}

/// History: A → B → C on master, A → D on feature
#[rstest]
#[tokio::test]
async fn merge_diff_from_branch_point(repository_dir: TempDir) {
    let history = History::new(repository_dir);
    let files = vec![FileSpec::random("notes.txt", 12)];
    let a = history.commit(&[], &files, "A");
    let b = history.commit(&[&a], &with_file(&files, file("b.txt", "b\n")), "B");
    let c = history.commit(&[&b], &with_file(&files, file("c.txt", "c\n")), "C");
    let new_notes = FileSpec::random("notes.txt", 5);
    let d = history.commit(&[&a], &[new_notes.clone()], "D");
    history.branch("master", &c);
    history.branch("feature", &d);

    let report = history
        .repository
        .compute_merge_diff("master", Some("feature"), &DiffOptions::default())
        .await
        .unwrap();

    assert_eq!(report.base_commit_id, a);
    assert_eq!(paths(&report), vec!["notes.txt"]);
    let change = &report.changes[0];
    assert_eq!(
        change.added_lines as isize - change.deleted_lines as isize,
        new_notes.lines() as isize - files[0].lines() as isize
    );
}

#[rstest]
#[tokio::test]
async fn target_ancestor_of_source_is_the_base(repository_dir: TempDir) {
    let history = History::new(repository_dir);
    let files = vec![file("a.txt", "1\n")];
    let a = history.commit(&[], &files, "A");
    let b = history.commit(&[&a], &with_file(&files, file("a.txt", "1\n2\n")), "B");
    history.branch("master", &a);
    history.branch("feature", &b);

    let report = history
        .repository
        .compute_merge_diff("master", Some("feature"), &DiffOptions::default())
        .await
        .unwrap();

    assert_eq!(report.base_commit_id, a);
    assert_eq!(report.diff_summary.total_insertions, 1);
    assert_eq!(report.diff_summary.total_deletions, 0);
}

/// Nested additions, deletions and a file replaced by a directory
#[rstest]
#[tokio::test]
async fn nested_paths_are_reported_in_tree_order(repository_dir: TempDir) {
    let history = History::new(repository_dir);
    let base_files = vec![
        file("README", "readme\n"),
        file("docs", "docs as a file\n"),
        file("src/main.rs", "fn main() {}\n"),
        file("src/util/mod.rs", "pub mod io;\n"),
        file("src/util/io.rs", "pub fn read() {}\n"),
    ];
    let base = history.commit(&[], &base_files, "base");
    let master = history.commit(&[&base], &with_file(&base_files, file("NEWS", "n\n")), "news");

    let mut feature_files = without_file(&base_files, "src/util/io.rs");
    feature_files = without_file(&feature_files, "docs");
    feature_files.push(file("docs/index.md", "# docs\n"));
    feature_files.push(file("src/util/net.rs", "pub fn connect() {}\n"));
    feature_files = with_file(&feature_files, file("src/util/mod.rs", "pub mod net;\n"));
    let feature = history.commit(&[&base], &feature_files, "restructure");
    history.branch("master", &master);
    history.branch("feature", &feature);

    let report = history
        .repository
        .compute_merge_diff("master", Some("feature"), &DiffOptions::default())
        .await
        .unwrap();

    assert_eq!(
        paths(&report),
        vec![
            "docs",
            "docs/index.md",
            "src/util/io.rs",
            "src/util/mod.rs",
            "src/util/net.rs",
        ]
    );
    assert_eq!(report.diff_summary.total_files_changed, 5);
    assert_eq!(report.diff_summary.total_insertions, 3);
    assert_eq!(report.diff_summary.total_deletions, 3);
}

/// History:
///     A
///    / \
///   B   C
///   |\ /|
///   | X |
///   |/ \|
///   D   E
///   |   |
/// master feature
///
/// B and C are both best common ancestors; C is newer.
#[rstest]
#[case(MergeBaseStrategy::Best)]
#[case(MergeBaseStrategy::Bfs)]
#[tokio::test]
async fn criss_cross_picks_a_single_base(
    repository_dir: TempDir,
    #[case] strategy: MergeBaseStrategy,
) {
    let history = History::new(repository_dir);
    let a = history.commit(&[], &[file("f.txt", "a\n")], "A");
    let b = history.commit(&[&a], &[file("f.txt", "b\n")], "B");
    let c = history.commit(&[&a], &[file("f.txt", "c\n")], "C");
    let d = history.commit(&[&b, &c], &[file("f.txt", "d\n")], "D");
    let e = history.commit(&[&c, &b], &[file("f.txt", "e\n")], "E");
    history.branch("master", &d);
    history.branch("feature", &e);

    let report = history
        .repository
        .compute_merge_diff("master", Some("feature"), &options(strategy))
        .await
        .unwrap();

    let expected = match strategy {
        MergeBaseStrategy::Best => &c,
        // breadth-first from master reaches its first parent first
        MergeBaseStrategy::Bfs => &b,
    };
    assert_eq!(&report.base_commit_id, expected);
    assert_eq!(paths(&report), vec!["f.txt"]);
}

#[rstest]
#[tokio::test]
async fn disjoint_histories_fail_without_a_report(repository_dir: TempDir) {
    let history = History::new(repository_dir);
    let a = history.commit(&[], &[file("a.txt", "a\n")], "A");
    let z = history.commit(&[], &[file("z.txt", "z\n")], "Z");
    history.branch("master", &a);
    history.branch("orphan", &z);

    let error = history
        .repository
        .compute_merge_diff("orphan", Some("master"), &DiffOptions::default())
        .await
        .unwrap_err();

    assert_eq!(error.stage, PipelineStage::RefsResolved);
    assert!(matches!(
        error.error(),
        DiffError::NoCommonAncestor { left, right } if *left == a && *right == z
    ));
}

#[rstest]
#[tokio::test]
async fn commit_diff_compares_any_two_revisions(repository_dir: TempDir) {
    let history = History::new(repository_dir);
    let a = history.commit(&[], &[file("a.txt", "a\nb\nc\n")], "A");
    let b = history.commit(&[&a], &[file("a.txt", "a\nx\nc\n")], "B");
    history.branch("master", &b);
    history.checkout("master");

    let report = history
        .repository
        .compute_commit_diff("HEAD~1", "HEAD", &DiffOptions::default())
        .await
        .unwrap();

    assert_eq!(report.base_commit_id, a);
    assert_eq!(report.changes[0].hunks[0].header(), "@@ -1,3 +1,3 @@");

    let reversed = history
        .repository
        .compute_commit_diff("master", &a.to_short_oid(), &DiffOptions::default())
        .await
        .unwrap();
    assert_eq!(reversed.base_commit_id, b);
    assert_eq!(reversed.changes[0].added_lines, 1);
    assert_eq!(reversed.changes[0].hunks[0].lines[1].content, "x");
}

#[rstest]
#[tokio::test]
async fn one_repository_serves_concurrent_queries(repository_dir: TempDir) {
    let history = History::new(repository_dir);
    let files = (0..20)
        .map(|i| FileSpec::random(&format!("dir{}/file{i}.txt", i % 4), 8))
        .collect::<Vec<_>>();
    let base = history.commit(&[], &files, "base");
    let changed = files
        .iter()
        .map(|f| FileSpec::random(&f.path, 6))
        .collect::<Vec<_>>();
    let feature = history.commit(&[&base], &changed, "rewrite");
    history.branch("master", &base);
    history.branch("feature", &feature);
    let (_dir, repository) = history.into_parts();
    let repository = Arc::new(repository);

    let mut handles = Vec::new();
    for jobs in 1..=4 {
        let repository = Arc::clone(&repository);
        handles.push(tokio::spawn(async move {
            let options = DiffOptions::new(3, jobs, MergeBaseStrategy::Best, None);
            repository
                .compute_merge_diff("master", Some("feature"), &options)
                .await
        }));
    }

    let mut reports = Vec::new();
    for handle in handles {
        reports.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(reports[0].changes.len(), 20);
    assert!(reports.windows(2).all(|w| w[0] == w[1]));
}
