//! Diff report assembly and JSON output

use crate::artifacts::core::error::DiffResult;
use crate::artifacts::diff::hunk::Hunk;
use crate::artifacts::objects::object_id::ObjectId;
use serde::Serialize;
use serde_json::ser::{CompactFormatter, PrettyFormatter, Serializer};
use std::io::Write;

const JSON_INDENT: &[u8] = b"    ";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub total_files_changed: usize,
    pub total_insertions: usize,
    pub total_deletions: usize,
}

/// Line-level changes to one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub file_path: String,
    pub added_lines: usize,
    pub deleted_lines: usize,
    pub hunks: Vec<Hunk>,
}

impl FileChange {
    /// Counts are derived from the hunks
    pub fn new(file_path: String, hunks: Vec<Hunk>) -> Self {
        FileChange {
            added_lines: hunks.iter().map(Hunk::additions).sum(),
            deleted_lines: hunks.iter().map(Hunk::deletions).sum(),
            file_path,
            hunks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    pub source_branch: String,
    pub target_branch: String,
    pub base_commit_id: ObjectId,
    pub diff_summary: DiffSummary,
    pub changes: Vec<FileChange>,
}

/// Aggregate per-file changes, keeping their order
pub fn assemble(
    source_ref: &str,
    target_ref: &str,
    base_id: ObjectId,
    changes: Vec<FileChange>,
) -> DiffReport {
    let diff_summary = DiffSummary {
        total_files_changed: changes.len(),
        total_insertions: changes.iter().map(|c| c.added_lines).sum(),
        total_deletions: changes.iter().map(|c| c.deleted_lines).sum(),
    };

    DiffReport {
        source_branch: source_ref.to_string(),
        target_branch: target_ref.to_string(),
        base_commit_id: base_id,
        diff_summary,
        changes,
    }
}

impl DiffReport {
    /// Write the report as JSON, four-space indented unless `compact`
    pub fn write_json(&self, writer: impl Write, compact: bool) -> DiffResult<()> {
        if compact {
            let mut serializer = Serializer::with_formatter(writer, CompactFormatter);
            self.serialize(&mut serializer)?;
        } else {
            let mut serializer =
                Serializer::with_formatter(writer, PrettyFormatter::with_indent(JSON_INDENT));
            self.serialize(&mut serializer)?;
        }

        Ok(())
    }

    pub fn to_json(&self, compact: bool) -> DiffResult<String> {
        let mut buffer = Vec::new();
        self.write_json(&mut buffer, compact)?;

        // serde_json only emits UTF-8
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::diff::diff_lines;
    use pretty_assertions::assert_eq;

    fn base() -> ObjectId {
        ObjectId::try_parse("0123456789abcdef0123456789abcdef01234567".to_string()).unwrap()
    }

    fn sample() -> DiffReport {
        assemble(
            "feature",
            "main",
            base(),
            vec![
                FileChange::new("a.txt".to_string(), diff_lines("a\nb\nc\n", "a\nx\nc\n", 3)),
                FileChange::new("new.txt".to_string(), diff_lines("", "1\n2\n", 3)),
            ],
        )
    }

    #[test]
    fn summary_sums_file_counts() {
        let report = sample();

        assert_eq!(
            report.diff_summary,
            DiffSummary {
                total_files_changed: 2,
                total_insertions: 3,
                total_deletions: 1,
            }
        );
        assert_eq!(report.changes[0].file_path, "a.txt");
    }

    #[test]
    fn empty_change_list_is_an_empty_report() {
        let report = assemble("a", "b", base(), vec![]);

        assert_eq!(report.diff_summary, DiffSummary::default());
        assert!(report.changes.is_empty());
    }

    #[test]
    fn json_has_the_documented_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&sample().to_json(false).unwrap()).unwrap();

        assert_eq!(json["source_branch"], "feature");
        assert_eq!(json["target_branch"], "main");
        assert_eq!(json["base_commit_id"], base().to_string());
        assert_eq!(json["diff_summary"]["total_insertions"], 3);
        assert_eq!(json["changes"][1]["hunks"][0]["header"], "@@ -0,0 +1,2 @@");
        assert_eq!(json["changes"][1]["hunks"][0]["lines"][0]["type"], "+");
        assert!(json["changes"][1]["hunks"][0]["lines"][0]["old_lineno"].is_null());
    }

    #[test]
    fn pretty_output_uses_four_spaces_and_compact_one_line() {
        let report = sample();

        let pretty = report.to_json(false).unwrap();
        let compact = report.to_json(true).unwrap();

        assert!(pretty.starts_with("{\n    \"source_branch\": \"feature\","));
        assert!(!compact.contains('\n'));
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&pretty).unwrap(),
            serde_json::from_str::<serde_json::Value>(&compact).unwrap()
        );
    }
}
