//! Assembly pipeline orchestration.
//!
//! Runs normalize → concatenate → overlay-audio → transitions strictly in
//! sequence, recording one [`StageRecord`] per stage invocation. Only a
//! concatenate failure ends the run as [`RunStatus::Failed`]; every other
//! failure is absorbed by continuing with the previous artifact.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use reelforge_common::config::AppConfig;
use reelforge_common::error::{ReelforgeError, ReelforgeResult};
use reelforge_script_model::artifact::MediaArtifact;
use reelforge_timing_core::sync::SyncDecision;
use serde::{Deserialize, Serialize};

use crate::probe::{DurationProbe, FfmpegProbe};
use crate::runner::{ProcessRunner, StageError, ToolRunner};
use crate::stages::{
    ConcatStage, FailurePolicy, NormalizeStage, OverlayAudioStage, Stage, StageContext,
    StageName, TransitionsStage,
};

/// File extensions accepted as generated clips.
pub const CLIP_EXTENSIONS: [&str; 5] = ["mp4", "webm", "avi", "mov", "mkv"];

/// Timestamp format used in output file names.
const RUN_TAG_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Outcome of one stage invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Ok,
    Failed,
    Skipped,
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Completed,
    Failed,
    DryRun,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::DryRun => "dry-run",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: StageName,
    pub status: StageStatus,

    /// Artifact written by the stage, when it produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,

    /// Input the stage worked on, for per-clip stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<PathBuf>,

    /// Failure reason, fallback taken, or why the stage was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StageRecord {
    fn new(stage: StageName, status: StageStatus) -> Self {
        Self {
            stage,
            status,
            artifact: None,
            subject: None,
            detail: None,
        }
    }

    fn skipped(stage: StageName, detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Self::new(stage, StageStatus::Skipped)
        }
    }
}

/// Everything a run produced, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyResult {
    pub status: RunStatus,
    pub started_at: DateTime<Local>,
    pub clips_count: usize,
    pub stages: Vec<StageRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_artifact: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncDecision>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size_mb: Option<f64>,

    /// Why the run failed, when it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AssemblyResult {
    fn new(status: RunStatus, clips_count: usize, audio: Option<PathBuf>) -> Self {
        Self {
            status,
            started_at: Local::now(),
            clips_count,
            stages: Vec::new(),
            final_artifact: None,
            audio,
            sync: None,
            file_size_mb: None,
            error: None,
        }
    }

    /// Records for one stage, in execution order.
    pub fn records_for(&self, stage: StageName) -> impl Iterator<Item = &StageRecord> {
        self.stages.iter().filter(move |r| r.stage == stage)
    }

    /// Whether any record of `stage` has the given status.
    pub fn has(&self, stage: StageName, status: StageStatus) -> bool {
        self.records_for(stage).any(|r| r.status == status)
    }

    pub fn is_success(&self) -> bool {
        self.status != RunStatus::Failed
    }

    /// Write the result as pretty JSON, creating parent directories.
    pub fn write_json(&self, path: &Path) -> ReelforgeResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Inputs to one aggregation run.
#[derive(Debug, Clone, Default)]
pub struct AssemblyRequest {
    /// Clips in playback order.
    pub clips: Vec<PathBuf>,
    pub audio: Option<PathBuf>,
    pub dry_run: bool,

    /// Suffix for output file names; the current local time when unset.
    pub run_tag: Option<String>,
}

impl AssemblyRequest {
    pub fn new(clips: Vec<PathBuf>) -> Self {
        Self {
            clips,
            ..Self::default()
        }
    }

    pub fn with_audio(mut self, audio: impl Into<PathBuf>) -> Self {
        self.audio = Some(audio.into());
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_run_tag(mut self, tag: impl Into<String>) -> Self {
        self.run_tag = Some(tag.into());
        self
    }
}

/// Current local time formatted for output file names.
pub fn run_tag_now() -> String {
    Local::now().format(RUN_TAG_FORMAT).to_string()
}

/// Directory holding every output of a run.
pub fn final_dir(config: &AppConfig) -> PathBuf {
    config.output_dir.join("final")
}

/// Default location of the result summary for a run tag.
pub fn result_path(config: &AppConfig, run_tag: &str) -> PathBuf {
    final_dir(config).join(format!("aggregation-result-{run_tag}.json"))
}

/// Clip files in `dir`, sorted by file name.
///
/// A missing directory yields an empty list; the pipeline reports that as a
/// missing artifact.
pub fn discover_clips(dir: &Path) -> ReelforgeResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "Clips directory does not exist");
        return Ok(Vec::new());
    }

    let mut clips = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_clip(&path) {
            clips.push(path);
        }
    }
    clips.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    tracing::debug!(dir = %dir.display(), count = clips.len(), "Discovered clips");
    Ok(clips)
}

fn is_clip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            CLIP_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Drives the four assembly stages through a [`ToolRunner`].
pub struct AssemblyPipeline {
    config: AppConfig,
    runner: Box<dyn ToolRunner>,
    probe: Box<dyn DurationProbe>,
}

impl AssemblyPipeline {
    /// Pipeline that runs the configured ffmpeg binary.
    pub fn new(config: AppConfig) -> Self {
        let probe = FfmpegProbe::new(config.ffmpeg_path.clone(), config.timeouts.probe());
        Self::with_tools(config, Box::new(ProcessRunner::new()), Box::new(probe))
    }

    pub fn with_tools(
        config: AppConfig,
        runner: Box<dyn ToolRunner>,
        probe: Box<dyn DurationProbe>,
    ) -> Self {
        Self {
            config,
            runner,
            probe,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Result of a run that would process `request`, without running anything.
    pub fn plan_only(&self, request: &AssemblyRequest) -> AssemblyResult {
        let mut result =
            AssemblyResult::new(RunStatus::DryRun, request.clips.len(), request.audio.clone());
        for clip in &request.clips {
            result.stages.push(StageRecord {
                subject: Some(clip.clone()),
                ..StageRecord::skipped(StageName::Normalize, "dry run")
            });
        }
        for stage in &StageName::ALL[1..] {
            result.stages.push(StageRecord::skipped(*stage, "dry run"));
        }

        tracing::info!(clips = request.clips.len(), "Dry run, no tools invoked");
        result
    }

    /// Run the pipeline to completion.
    ///
    /// Returns `Err` only when the inputs are unusable; stage failures are
    /// reported through the returned [`AssemblyResult`].
    pub fn run(&self, request: &AssemblyRequest) -> ReelforgeResult<AssemblyResult> {
        if request.dry_run {
            return Ok(self.plan_only(request));
        }

        if request.clips.is_empty() {
            return Err(ReelforgeError::missing_artifact("no clips to assemble"));
        }
        if let Some(missing) = request.clips.iter().find(|clip| !clip.is_file()) {
            return Err(ReelforgeError::missing_artifact(format!(
                "clip not found: {}",
                missing.display()
            )));
        }

        let tag = request.run_tag.clone().unwrap_or_else(run_tag_now);
        let out_dir = final_dir(&self.config);
        let norm_dir = out_dir.join("normalized");
        std::fs::create_dir_all(&norm_dir)?;

        let ctx = StageContext {
            runner: self.runner.as_ref(),
            probe: self.probe.as_ref(),
            config: &self.config,
        };
        let mut result =
            AssemblyResult::new(RunStatus::Completed, request.clips.len(), request.audio.clone());

        tracing::info!(
            clips = request.clips.len(),
            audio = ?request.audio,
            output_dir = %out_dir.display(),
            "Starting assembly"
        );

        // Normalize
        let mut normalized = Vec::with_capacity(request.clips.len());
        for (idx, clip) in request.clips.iter().enumerate() {
            let original = MediaArtifact::video(clip);
            let stage = NormalizeStage {
                output: norm_dir.join(format!("norm-{idx:03}.mp4")),
            };
            let artifact =
                run_stage(&stage, &original, Some(&original), Some(clip.as_path()), &ctx, &mut result)
                    .unwrap_or(original);
            normalized.push(artifact);
        }

        // Concatenate
        let concat = ConcatStage {
            list_file: out_dir.join("concat-list.txt"),
            output: out_dir.join(format!("merged-{tag}.mp4")),
        };
        let merged = match run_stage(&concat, normalized.as_slice(), None, None, &ctx, &mut result)
        {
            Ok(merged) => merged,
            Err(err) => {
                let err = err.into_reelforge(StageName::Concatenate.as_str());
                tracing::error!(error = %err, "Concatenation failed, aborting assembly");
                result.status = RunStatus::Failed;
                result.error = Some(err.to_string());
                return Ok(result);
            }
        };

        // Overlay audio
        let with_audio = match &request.audio {
            Some(audio_path) if audio_path.is_file() => {
                let audio = MediaArtifact::audio(audio_path);
                let stage = OverlayAudioStage::prepare(
                    &merged,
                    &audio,
                    out_dir.join(format!("with-audio-{tag}.mp4")),
                    &ctx,
                );
                result.sync = Some(stage.decision);
                run_stage(&stage, &merged, Some(&merged), None, &ctx, &mut result)
                    .unwrap_or_else(|_| merged.clone())
            }
            Some(audio_path) => {
                tracing::warn!(audio = %audio_path.display(), "Audio file not found, skipping overlay");
                result.stages.push(StageRecord::skipped(
                    StageName::OverlayAudio,
                    format!("audio not found: {}", audio_path.display()),
                ));
                merged
            }
            None => {
                tracing::info!("No audio supplied, skipping overlay");
                result.stages.push(StageRecord::skipped(
                    StageName::OverlayAudio,
                    "no audio supplied",
                ));
                merged
            }
        };

        // Transitions
        let transitions = TransitionsStage {
            output: out_dir.join(format!("final-{tag}.mp4")),
        };
        let final_artifact =
            run_stage(&transitions, &with_audio, Some(&with_audio), None, &ctx, &mut result)
                .unwrap_or_else(|_| with_audio.clone());

        result.file_size_mb = final_artifact.size_mb().map(round_mb);
        result.final_artifact = Some(final_artifact.path);

        tracing::info!(
            final_artifact = ?result.final_artifact,
            file_size_mb = ?result.file_size_mb,
            "Assembly completed"
        );
        Ok(result)
    }
}

/// Megabytes to two decimals, as reported in the result file.
fn round_mb(mb: f64) -> f64 {
    (mb * 100.0).round() / 100.0
}

/// Run one stage, record its outcome and apply its failure policy.
///
/// A degradable stage with a `fallback` yields that fallback on failure; a
/// fatal stage (or one with nothing to fall back to) returns the error.
fn run_stage<S: Stage + ?Sized>(
    stage: &S,
    input: &S::Input,
    fallback: Option<&MediaArtifact>,
    subject: Option<&Path>,
    ctx: &StageContext<'_>,
    result: &mut AssemblyResult,
) -> Result<MediaArtifact, StageError> {
    let name = stage.name();
    tracing::info!(stage = %name, subject = ?subject, "Stage started");

    let mut record = StageRecord::new(name, StageStatus::Ok);
    record.subject = subject.map(Path::to_path_buf);

    match stage.run(input, ctx) {
        Ok(artifact) => {
            tracing::info!(stage = %name, artifact = %artifact.path.display(), "Stage succeeded");
            record.artifact = Some(artifact.path.clone());
            result.stages.push(record);
            Ok(artifact)
        }
        Err(err) => {
            record.status = StageStatus::Failed;
            match (stage.failure_policy(), fallback) {
                (FailurePolicy::Degrade, Some(fallback)) => {
                    tracing::warn!(
                        stage = %name,
                        error = %err,
                        fallback = %fallback.path.display(),
                        "Stage failed, continuing with previous artifact"
                    );
                    record.detail = Some(format!(
                        "{err}; using {}",
                        fallback.path.display()
                    ));
                    result.stages.push(record);
                    Ok(fallback.clone())
                }
                _ => {
                    tracing::error!(stage = %name, error = %err, "Stage failed");
                    record.detail = Some(err.to_string());
                    result.stages.push(record);
                    Err(err)
                }
            }
        }
    }
}

/// Run the pipeline on a blocking worker thread.
pub async fn assemble_video(
    config: AppConfig,
    request: AssemblyRequest,
) -> ReelforgeResult<AssemblyResult> {
    let pipeline = AssemblyPipeline::new(config);
    tokio::task::spawn_blocking(move || pipeline.run(&request))
        .await
        .map_err(|e| ReelforgeError::Other(anyhow::anyhow!("assembly task panicked: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_clips_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["clip-010.mp4", "clip-002.MOV", "notes.txt", "clip-001.webm"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.mp4")).unwrap();

        let clips = discover_clips(dir.path()).unwrap();
        let names: Vec<_> = clips
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["clip-001.webm", "clip-002.MOV", "clip-010.mp4"]);
    }

    #[test]
    fn test_discover_clips_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let clips = discover_clips(&dir.path().join("absent")).unwrap();
        assert!(clips.is_empty());
    }

    #[test]
    fn test_run_status_serializes_kebab_case() {
        assert_eq!(serde_json::to_value(RunStatus::DryRun).unwrap(), "dry-run");
        assert_eq!(RunStatus::Completed.to_string(), "completed");
        assert_eq!(serde_json::to_value(StageStatus::Skipped).unwrap(), "skipped");
    }

    #[test]
    fn test_round_mb_keeps_two_decimals() {
        assert_eq!(round_mb(12.3456), 12.35);
        assert_eq!(round_mb(0.004), 0.0);
        assert_eq!(round_mb(7.0), 7.0);
    }

    #[test]
    fn test_result_path_uses_run_tag() {
        let config = AppConfig {
            output_dir: PathBuf::from("out"),
            ..AppConfig::default()
        };
        assert_eq!(
            result_path(&config, "20260101-120000"),
            PathBuf::from("out/final/aggregation-result-20260101-120000.json")
        );
    }

    #[test]
    fn test_write_json_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("final").join("result.json");
        let result = AssemblyResult::new(RunStatus::Completed, 2, None);
        result.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["clips_count"], 2);
        assert!(value.get("sync").is_none());
    }
}
