//! Audio/video synchronization policy.
//!
//! Video clips and the music track are produced independently, so their
//! rendered lengths rarely agree. Given both measured durations, the policy
//! picks one of three reconciliation strategies:
//!
//! | Condition                      | Strategy     | Output length       |
//! |--------------------------------|--------------|---------------------|
//! | either duration unknown        | `shortest`   | unknown             |
//! | `|video - audio| <= tolerance`  | `shortest`   | `min(video, audio)` |
//! | video shorter beyond tolerance | `pad-video`  | `audio`             |
//! | audio shorter beyond tolerance | `fade-audio` | `video`             |
//!
//! `fade-audio` fades the music out over its last `fade_window` seconds and
//! leaves the rest of the video silent.

use std::fmt;

use reelforge_common::config::SyncConfig;
use serde::{Deserialize, Serialize};

/// Strategy tag without parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStrategy {
    Shortest,
    PadVideo,
    FadeAudio,
}

impl SyncStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shortest => "shortest",
            Self::PadVideo => "pad-video",
            Self::FadeAudio => "fade-audio",
        }
    }
}

impl fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reconciliation strategy together with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum SyncDecision {
    /// Trim the longer stream to the shorter one.
    Shortest,

    /// Hold the last video frame for `pad_secs` so the whole audio track plays.
    PadVideo { pad_secs: f64 },

    /// Fade the audio out at its own end and keep the full video.
    FadeAudio {
        fade_start_secs: f64,
        fade_duration_secs: f64,
    },
}

impl SyncDecision {
    pub fn strategy(&self) -> SyncStrategy {
        match self {
            Self::Shortest => SyncStrategy::Shortest,
            Self::PadVideo { .. } => SyncStrategy::PadVideo,
            Self::FadeAudio { .. } => SyncStrategy::FadeAudio,
        }
    }

    /// Length of the merged output for the given input lengths.
    pub fn output_duration(&self, video_secs: Option<f64>, audio_secs: Option<f64>) -> Option<f64> {
        let (video, audio) = (video_secs?, audio_secs?);
        Some(match self {
            Self::Shortest => video.min(audio),
            Self::PadVideo { .. } => audio,
            Self::FadeAudio { .. } => video,
        })
    }
}

/// Chooses a [`SyncDecision`] from measured durations.
#[derive(Debug, Clone)]
pub struct SyncPolicy {
    config: SyncConfig,
}

impl SyncPolicy {
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    /// Policy with a 2s tolerance and a 3s fade window.
    pub fn with_defaults() -> Self {
        Self::new(SyncConfig::default())
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Decide how to merge a video of `video_secs` with audio of `audio_secs`.
    ///
    /// An unknown duration on either side always yields `Shortest`.
    pub fn decide(&self, video_secs: Option<f64>, audio_secs: Option<f64>) -> SyncDecision {
        let (Some(video), Some(audio)) = (video_secs, audio_secs) else {
            tracing::debug!(?video_secs, ?audio_secs, "Duration unknown, using shortest");
            return SyncDecision::Shortest;
        };

        let diff = video - audio;
        let decision = if diff.abs() <= self.config.tolerance_secs {
            SyncDecision::Shortest
        } else if diff < 0.0 {
            SyncDecision::PadVideo {
                pad_secs: audio - video,
            }
        } else {
            SyncDecision::FadeAudio {
                fade_start_secs: (audio - self.config.fade_window_secs).max(0.0),
                fade_duration_secs: self.config.fade_window_secs,
            }
        };

        tracing::debug!(
            video_secs = video,
            audio_secs = audio,
            diff_secs = diff,
            strategy = %decision.strategy(),
            "Sync decision"
        );
        decision
    }
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self::with_defaults()
    }
}
