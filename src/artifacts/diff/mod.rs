//! Tree and line diffing
//!
//! - `tree_diff`: which file paths differ between two trees
//! - `myers`: minimal edit script between two line sequences
//! - `hunk`: grouping an edit script into context hunks

pub mod hunk;
pub mod myers;
pub mod tree_diff;

use crate::artifacts::diff::hunk::Hunk;
use crate::artifacts::diff::myers::{DiffAlgorithm, MyersDiff};

/// Unchanged lines kept around each change unless configured otherwise
pub const DEFAULT_CONTEXT_LINES: usize = 3;

/// One line of text without its `\n`, remembering whether it had one.
///
/// Lines compare on both fields, so a file that gains or loses its final
/// newline still differs on its last line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLine<'t> {
    pub content: &'t str,
    pub terminated: bool,
}

impl AsRef<str> for TextLine<'_> {
    fn as_ref(&self) -> &str {
        self.content
    }
}

/// Split text into lines.
///
/// A final line without a terminator is still a line; a trailing terminator
/// does not start an extra empty line.
pub fn split_lines(text: &str) -> Vec<TextLine<'_>> {
    text.split_inclusive('\n')
        .map(|line| match line.strip_suffix('\n') {
            Some(content) => TextLine {
                content,
                terminated: true,
            },
            None => TextLine {
                content: line,
                terminated: false,
            },
        })
        .collect()
}

/// Hunks turning `old` into `new`; identical texts give no hunks
pub fn diff_lines(old: &str, new: &str, context: usize) -> Vec<Hunk> {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);

    let edits = MyersDiff::new(&old_lines, &new_lines).diff();
    Hunk::build(&edits, context)
}
