//! Reelforge Timing Core
//!
//! The decision-making half of Reelforge:
//! - **Segmenter:** split a scene into sub-clips within the generator's length bounds
//! - **Clip Plan:** number every sub-clip of a script and name its generated file
//! - **Sync Policy:** choose how to reconcile a video track and an audio track
//!   whose measured durations differ
//!
//! This crate is pure computation: no I/O, no processes, no hidden state.
//! All inputs are data; all outputs are data.

pub mod plan;
pub mod segmenter;
pub mod sync;

pub use plan::{plan_clips, ClipPlan, PlannedClip};
pub use segmenter::Segmenter;
pub use sync::{SyncDecision, SyncPolicy, SyncStrategy};
