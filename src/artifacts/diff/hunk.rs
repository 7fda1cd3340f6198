//! Grouping an edit script into hunks
//!
//! Each run of changes keeps up to `context` unchanged lines on either side.
//! Two runs separated by at most `2 * context` unchanged lines share a hunk.

use crate::artifacts::diff::myers::Edit;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Which side a hunk line comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LineOrigin {
    #[serde(rename = "+")]
    Added,
    #[serde(rename = "-")]
    Deleted,
    #[serde(rename = " ")]
    Context,
}

impl LineOrigin {
    pub fn symbol(&self) -> char {
        match self {
            LineOrigin::Added => '+',
            LineOrigin::Deleted => '-',
            LineOrigin::Context => ' ',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HunkLine {
    pub content: String,
    #[serde(rename = "type")]
    pub origin: LineOrigin,
    pub new_lineno: Option<usize>,
    pub old_lineno: Option<usize>,
}

impl<T: AsRef<str>> From<&Edit<T>> for HunkLine {
    fn from(edit: &Edit<T>) -> Self {
        let origin = match edit {
            Edit::Delete { .. } => LineOrigin::Deleted,
            Edit::Insert { .. } => LineOrigin::Added,
            Edit::Equal { .. } => LineOrigin::Context,
        };

        HunkLine {
            content: edit.value().as_ref().to_string(),
            origin,
            new_lineno: edit.new_line().map(|line| line.number),
            old_lineno: edit.old_line().map(|line| line.number),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    /// Group `edits` into hunks with `context` unchanged lines around changes
    pub fn build<T: AsRef<str>>(edits: &[Edit<T>], context: usize) -> Vec<Hunk> {
        let changes = edits
            .iter()
            .enumerate()
            .filter(|(_, edit)| edit.is_change())
            .map(|(index, _)| index)
            .collect::<Vec<_>>();

        let Some((&first, rest)) = changes.split_first() else {
            return Vec::new();
        };

        let mut groups = vec![(first, first)];
        let max_gap = context.saturating_mul(2);
        for &index in rest {
            match groups.last_mut() {
                Some((_, last)) if index - *last - 1 <= max_gap => *last = index,
                _ => groups.push((index, index)),
            }
        }

        groups
            .into_iter()
            .map(|(first, last)| {
                let start = first.saturating_sub(context);
                let end = last.saturating_add(context).saturating_add(1).min(edits.len());
                Self::from_range(edits, start, end)
            })
            .collect()
    }

    fn from_range<T: AsRef<str>>(edits: &[Edit<T>], start: usize, end: usize) -> Hunk {
        let before = &edits[..start];
        let range = &edits[start..end];

        let old_before = before.iter().filter(|e| e.old_line().is_some()).count();
        let new_before = before.iter().filter(|e| e.new_line().is_some()).count();
        let old_count = range.iter().filter(|e| e.old_line().is_some()).count();
        let new_count = range.iter().filter(|e| e.new_line().is_some()).count();

        // an empty side starts at the line before the hunk
        let start_of = |before: usize, count: usize| if count == 0 { before } else { before + 1 };

        Hunk {
            old_start: start_of(old_before, old_count),
            old_count,
            new_start: start_of(new_before, new_count),
            new_count,
            lines: range.iter().map(HunkLine::from).collect(),
        }
    }

    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_count, self.new_start, self.new_count
        )
    }

    pub fn additions(&self) -> usize {
        self.count(LineOrigin::Added)
    }

    pub fn deletions(&self) -> usize {
        self.count(LineOrigin::Deleted)
    }

    fn count(&self, origin: LineOrigin) -> usize {
        self.lines.iter().filter(|line| line.origin == origin).count()
    }
}

impl Serialize for Hunk {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Hunk", 2)?;
        state.serialize_field("header", &self.header())?;
        state.serialize_field("lines", &self.lines)?;
        state.end()
    }
}
