//! Core utilities and shared types
//!
//! - `error`: the error taxonomy and pipeline stages
//! - `telemetry`: logging setup for the binary

pub mod error;
pub mod telemetry;
