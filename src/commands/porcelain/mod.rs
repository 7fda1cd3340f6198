//! Porcelain commands (user-facing queries)
//!
//! - `merge_diff`: the merge-diff and commit-diff pipelines
//! - `merge_base`: merge base of two named revisions

pub mod merge_base;
pub mod merge_diff;
