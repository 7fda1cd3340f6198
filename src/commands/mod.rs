//! Command implementations, as `Repository` methods
//!
//! - `plumbing`: direct access to the object store
//! - `porcelain`: the diff and merge-base queries

pub mod plumbing;
pub mod porcelain;
