//! Plumbing commands (low-level store inspection)
//!
//! - `cat-file`: print a stored object

pub mod cat_file;
