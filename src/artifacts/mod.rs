//! Object model and algorithms
//!
//! - `branch`: ref names and revision expressions
//! - `core`: errors, pipeline stages, logging setup
//! - `database`: tree entry references
//! - `diff`: tree diffing, Myers' line diff and hunk grouping
//! - `merge`: merge-base search
//! - `objects`: blob, tree and commit objects
//! - `report`: the JSON diff report

pub mod branch;
pub mod core;
pub mod database;
pub mod diff;
pub mod merge;
pub mod objects;
pub mod report;
