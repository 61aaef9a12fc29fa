//! Reelforge Assembly Engine
//!
//! Turns a directory of generated clips plus an optional music track into
//! one finished video by driving ffmpeg through four stages:
//!
//! ```text
//! clip-001.mp4 ─┐
//! clip-002.mp4 ─┼── Normalize (per clip, falls back to the source clip)
//! clip-00N.mp4 ─┘         │
//!                         ▼
//!                    Concatenate (fatal on failure)
//!                         │
//! music.mp3 ──────────────┤
//!                         ▼
//!                   Overlay Audio (probe → sync decision → merge)
//!                         │
//!                         ▼
//!                    Transitions (fade in / fade out)
//!                         │
//!                         ▼
//!                     final.mp4
//! ```
//!
//! Every external invocation goes through a [`runner::ToolRunner`] and every
//! duration measurement through a [`probe::DurationProbe`], so the pipeline
//! can be driven without ffmpeg in tests.

pub mod commands;
pub mod pipeline;
pub mod probe;
pub mod runner;
pub mod stages;

pub use pipeline::*;
pub use probe::{DurationProbe, FfmpegProbe};
pub use runner::{ProcessRunner, StageError, ToolInvocation, ToolOutput, ToolRunner};
