//! Core repository components
//!
//! - `database`: content-addressed object store for blobs, trees and commits
//! - `refs`: reference lookup (branches, tags, remotes, HEAD, packed refs)
//! - `repository`: discovery and the handle that ties both together

pub mod database;
pub mod refs;
pub mod repository;
