//! Merge base search over the commit graph

pub mod bca_finder;
pub mod merge_base;
