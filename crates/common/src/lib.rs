//! Reelforge Common Utilities
//!
//! Shared infrastructure for all Reelforge crates:
//! - Error types and result aliases
//! - Tracing/logging initialization
//! - Configuration loading and validation

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
