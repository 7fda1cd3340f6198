//! Merge diffs over a content-addressed commit graph
//!
//! - `areas`: the object store, refs and the repository handle
//! - `artifacts`: objects, revisions, merge bases, diffing and reports
//! - `commands`: queries exposed on `Repository`

pub mod areas;
pub mod artifacts;
pub mod commands;
