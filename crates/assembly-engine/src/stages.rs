//! Assembly stages.
//!
//! Each stage turns its input into exactly one new artifact or fails with a
//! [`StageError`]. Stages never decide what a failure means for the run;
//! they only declare a [`FailurePolicy`] and the pipeline acts on it.

use std::fmt;
use std::path::{Path, PathBuf};

use reelforge_common::config::AppConfig;
use reelforge_script_model::artifact::MediaArtifact;
use reelforge_timing_core::sync::{SyncDecision, SyncPolicy};
use serde::{Deserialize, Serialize};

use crate::commands;
use crate::probe::DurationProbe;
use crate::runner::{StageError, ToolInvocation, ToolRunner};

/// Pipeline stage identifiers, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageName {
    Normalize,
    Concatenate,
    OverlayAudio,
    Transitions,
}

impl StageName {
    pub const ALL: [StageName; 4] = [
        StageName::Normalize,
        StageName::Concatenate,
        StageName::OverlayAudio,
        StageName::Transitions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normalize => "normalize",
            Self::Concatenate => "concatenate",
            Self::OverlayAudio => "overlay-audio",
            Self::Transitions => "transitions",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the pipeline does when a stage fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the run; there is nothing to continue with.
    Fatal,
    /// Continue with the stage's input artifact.
    Degrade,
}

/// Shared collaborators and settings for one run.
pub struct StageContext<'a> {
    pub runner: &'a dyn ToolRunner,
    pub probe: &'a dyn DurationProbe,
    pub config: &'a AppConfig,
}

impl StageContext<'_> {
    fn invoke(&self, args: Vec<String>, timeout: std::time::Duration) -> Result<(), StageError> {
        let invocation = ToolInvocation::new(self.config.ffmpeg_path.clone(), args, timeout);
        tracing::debug!(command = %invocation.command_line(), "Invoking ffmpeg");
        self.runner
            .run(&invocation)?
            .check(&invocation.program)
            .map(|_| ())
    }
}

/// A single transformation step of the pipeline.
pub trait Stage {
    type Input: ?Sized;

    fn name(&self) -> StageName;

    fn failure_policy(&self) -> FailurePolicy;

    /// Produce this stage's artifact from `input`.
    fn run(&self, input: &Self::Input, ctx: &StageContext<'_>) -> Result<MediaArtifact, StageError>;
}

/// Re-encode one clip into the common output format.
pub struct NormalizeStage {
    pub output: PathBuf,
}

impl Stage for NormalizeStage {
    type Input = MediaArtifact;

    fn name(&self) -> StageName {
        StageName::Normalize
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Degrade
    }

    fn run(&self, input: &MediaArtifact, ctx: &StageContext<'_>) -> Result<MediaArtifact, StageError> {
        let args = commands::normalize_args(&input.path, &self.output, &ctx.config.render);
        ctx.invoke(args, ctx.config.timeouts.normalize())?;
        Ok(MediaArtifact::video(&self.output))
    }
}

/// Join the ordered clips through a concat demuxer list.
pub struct ConcatStage {
    pub list_file: PathBuf,
    pub output: PathBuf,
}

impl Stage for ConcatStage {
    type Input = [MediaArtifact];

    fn name(&self) -> StageName {
        StageName::Concatenate
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Fatal
    }

    fn run(&self, input: &[MediaArtifact], ctx: &StageContext<'_>) -> Result<MediaArtifact, StageError> {
        let clips = input
            .iter()
            .map(|clip| absolute(&clip.path))
            .collect::<Vec<_>>();
        std::fs::write(&self.list_file, commands::concat_list(&clips))?;

        let args = commands::concat_args(&self.list_file, &self.output, &ctx.config.render);
        ctx.invoke(args, ctx.config.timeouts.concat())?;
        Ok(MediaArtifact::video(&self.output))
    }
}

/// Merge the music track onto the silent video.
///
/// Durations are measured and the [`SyncDecision`] taken in
/// [`OverlayAudioStage::prepare`], so the decision can be recorded even when
/// the merge itself fails.
pub struct OverlayAudioStage {
    pub audio: MediaArtifact,
    pub video_secs: Option<f64>,
    pub decision: SyncDecision,
    pub output: PathBuf,
}

impl OverlayAudioStage {
    pub fn prepare(
        video: &MediaArtifact,
        audio: &MediaArtifact,
        output: PathBuf,
        ctx: &StageContext<'_>,
    ) -> Self {
        let video_secs = ctx.probe.probe(&video.path);
        let audio_secs = ctx.probe.probe(&audio.path);
        let decision = SyncPolicy::new(ctx.config.sync).decide(video_secs, audio_secs);

        tracing::info!(
            video_secs = ?video_secs,
            audio_secs = ?audio_secs,
            strategy = %decision.strategy(),
            "Audio sync strategy chosen"
        );

        Self {
            audio: audio.clone().with_duration(audio_secs),
            video_secs,
            decision,
            output,
        }
    }
}

impl Stage for OverlayAudioStage {
    type Input = MediaArtifact;

    fn name(&self) -> StageName {
        StageName::OverlayAudio
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Degrade
    }

    fn run(&self, input: &MediaArtifact, ctx: &StageContext<'_>) -> Result<MediaArtifact, StageError> {
        let args = commands::overlay_args(
            &input.path,
            &self.audio.path,
            &self.output,
            &self.decision,
            &ctx.config.render,
        );
        ctx.invoke(args, ctx.config.timeouts.overlay())?;

        let duration = self
            .decision
            .output_duration(self.video_secs, self.audio.duration_secs);
        Ok(MediaArtifact::video(&self.output).with_duration(duration))
    }
}

/// Fade in at the start and out at the end.
pub struct TransitionsStage {
    pub output: PathBuf,
}

impl Stage for TransitionsStage {
    type Input = MediaArtifact;

    fn name(&self) -> StageName {
        StageName::Transitions
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Degrade
    }

    fn run(&self, input: &MediaArtifact, ctx: &StageContext<'_>) -> Result<MediaArtifact, StageError> {
        let render = &ctx.config.render;
        let measured = ctx.probe.probe(&input.path);
        let total_secs = measured.unwrap_or_else(|| {
            tracing::warn!(
                assumed_secs = render.assumed_duration_secs,
                "Duration unknown, assuming default for fade-out"
            );
            render.assumed_duration_secs
        });

        let args =
            commands::transition_args(&input.path, &self.output, render.transition_secs, total_secs);
        ctx.invoke(args, ctx.config.timeouts.transitions())?;
        Ok(MediaArtifact::video(&self.output).with_duration(measured))
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names_render_kebab_case() {
        let names: Vec<&str> = StageName::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            names,
            vec!["normalize", "concatenate", "overlay-audio", "transitions"]
        );
        assert_eq!(
            serde_json::to_value(StageName::OverlayAudio).unwrap(),
            "overlay-audio"
        );
    }

    #[test]
    fn test_only_concatenate_is_fatal() {
        let normalize = NormalizeStage {
            output: PathBuf::new(),
        };
        let concat = ConcatStage {
            list_file: PathBuf::new(),
            output: PathBuf::new(),
        };
        let transitions = TransitionsStage {
            output: PathBuf::new(),
        };
        assert_eq!(normalize.failure_policy(), FailurePolicy::Degrade);
        assert_eq!(concat.failure_policy(), FailurePolicy::Fatal);
        assert_eq!(transitions.failure_policy(), FailurePolicy::Degrade);
    }

    #[test]
    fn test_absolute_keeps_absolute_paths() {
        let abs = std::env::temp_dir().join("clip.mp4");
        assert_eq!(absolute(&abs), abs);
        assert!(absolute(Path::new("clip.mp4")).is_absolute());
    }
}
