//! End-to-end pipeline behaviour against a scripted tool runner.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use reelforge_assembly_engine::stages::StageName;
use reelforge_assembly_engine::{
    AssemblyPipeline, AssemblyRequest, DurationProbe, RunStatus, StageError, StageStatus,
    ToolInvocation, ToolOutput, ToolRunner,
};
use reelforge_common::config::AppConfig;
use reelforge_common::error::ReelforgeError;
use reelforge_timing_core::sync::SyncDecision;
use tempfile::TempDir;

/// Succeeds by writing the output path (last argument) unless the output
/// name contains one of the configured failure markers.
#[derive(Clone, Default)]
struct ScriptedRunner {
    fail_outputs: Vec<String>,
    timeout_outputs: Vec<String>,
    calls: Arc<Mutex<Vec<ToolInvocation>>>,
}

impl ScriptedRunner {
    fn failing(markers: &[&str]) -> Self {
        Self {
            fail_outputs: markers.iter().map(|m| m.to_string()).collect(),
            ..Self::default()
        }
    }

    fn timing_out(markers: &[&str]) -> Self {
        Self {
            timeout_outputs: markers.iter().map(|m| m.to_string()).collect(),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<ToolInvocation> {
        self.calls.lock().unwrap().clone()
    }
}

impl ToolRunner for ScriptedRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, StageError> {
        self.calls.lock().unwrap().push(invocation.clone());
        let output = invocation.args.last().cloned().unwrap_or_default();

        if self.timeout_outputs.iter().any(|m| output.contains(m)) {
            return Err(StageError::Timeout {
                program: invocation.program.clone(),
                after: invocation.timeout,
            });
        }
        if self.fail_outputs.iter().any(|m| output.contains(m)) {
            return Ok(ToolOutput {
                success: false,
                status: "exit status: 1".into(),
                stdout: String::new(),
                stderr: "Conversion failed!".into(),
            });
        }

        std::fs::write(&output, b"rendered").unwrap();
        Ok(ToolOutput {
            success: true,
            status: "exit status: 0".into(),
            ..ToolOutput::default()
        })
    }
}

/// Durations keyed by file name prefix.
#[derive(Default)]
struct FixedProbe {
    durations: HashMap<&'static str, f64>,
}

impl FixedProbe {
    fn with(entries: &[(&'static str, f64)]) -> Self {
        Self {
            durations: entries.iter().copied().collect(),
        }
    }
}

impl DurationProbe for FixedProbe {
    fn probe(&self, path: &Path) -> Option<f64> {
        let name = path.file_name()?.to_str()?;
        self.durations
            .iter()
            .find(|(prefix, _)| name.starts_with(*prefix))
            .map(|(_, secs)| *secs)
    }
}

struct Fixture {
    _dir: TempDir,
    config: AppConfig,
    clips: Vec<PathBuf>,
    audio: PathBuf,
}

fn fixture(clip_count: usize) -> Fixture {
    let dir = TempDir::new().unwrap();
    let clips_dir = dir.path().join("clips");
    std::fs::create_dir_all(&clips_dir).unwrap();

    let clips = (1..=clip_count)
        .map(|i| {
            let path = clips_dir.join(format!("clip-{i:03}.mp4"));
            std::fs::write(&path, b"clip").unwrap();
            path
        })
        .collect();

    let audio = dir.path().join("music.mp3");
    std::fs::write(&audio, b"audio").unwrap();

    let config = AppConfig {
        output_dir: dir.path().join("output"),
        ..AppConfig::default()
    };

    Fixture {
        _dir: dir,
        config,
        clips,
        audio,
    }
}

fn pipeline(config: &AppConfig, runner: &ScriptedRunner, probe: FixedProbe) -> AssemblyPipeline {
    AssemblyPipeline::with_tools(config.clone(), Box::new(runner.clone()), Box::new(probe))
}

fn stage_sequence(calls: &[ToolInvocation]) -> Vec<String> {
    calls
        .iter()
        .map(|c| {
            let out = c.args.last().cloned().unwrap_or_default();
            let name = Path::new(&out)
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned();
            name.split('-').next().unwrap().to_string()
        })
        .collect()
}

#[test]
fn test_full_run_produces_final_artifact() {
    let fx = fixture(3);
    let runner = ScriptedRunner::default();
    let probe = FixedProbe::with(&[("merged", 45.0), ("music", 50.0), ("with", 50.0)]);
    let request = AssemblyRequest::new(fx.clips.clone())
        .with_audio(&fx.audio)
        .with_run_tag("20260101-120000");

    let result = pipeline(&fx.config, &runner, probe).run(&request).unwrap();

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.clips_count, 3);
    assert_eq!(result.sync, Some(SyncDecision::PadVideo { pad_secs: 5.0 }));
    assert_eq!(
        stage_sequence(&runner.calls()),
        vec!["norm", "norm", "norm", "merged", "with", "final"]
    );

    let final_path = result.final_artifact.clone().unwrap();
    assert!(final_path.ends_with("final/final-20260101-120000.mp4"));
    // 8 bytes on disk, reported to two decimals.
    assert_eq!(result.file_size_mb, Some(0.0));
    assert!(result.error.is_none());
    assert!(result.stages.iter().all(|r| r.status == StageStatus::Ok));

    let list = std::fs::read_to_string(fx.config.output_dir.join("final/concat-list.txt")).unwrap();
    assert_eq!(list.lines().count(), 3);
    assert!(list.contains("norm-000.mp4"));
    assert!(list.contains("norm-002.mp4"));

    let transitions_call = runner.calls().last().cloned().unwrap();
    assert!(transitions_call
        .args
        .contains(&"fade=t=in:st=0:d=0.5,fade=t=out:st=49.5:d=0.5".to_string()));
}

#[test]
fn test_normalize_failure_substitutes_original_clip() {
    let fx = fixture(3);
    let runner = ScriptedRunner::failing(&["norm-001"]);
    let request = AssemblyRequest::new(fx.clips.clone());

    let result = pipeline(&fx.config, &runner, FixedProbe::default())
        .run(&request)
        .unwrap();

    assert_eq!(result.status, RunStatus::Completed);
    let normalize: Vec<_> = result.records_for(StageName::Normalize).collect();
    assert_eq!(normalize.len(), 3);
    assert_eq!(normalize[1].status, StageStatus::Failed);
    assert_eq!(normalize[1].subject.as_deref(), Some(fx.clips[1].as_path()));
    assert!(normalize[1].detail.as_deref().unwrap().contains("Conversion failed!"));

    let list = std::fs::read_to_string(fx.config.output_dir.join("final/concat-list.txt")).unwrap();
    let lines: Vec<_> = list.lines().collect();
    assert!(lines[0].contains("norm-000.mp4"));
    assert!(lines[1].contains("clip-002.mp4"));
    assert!(lines[2].contains("norm-002.mp4"));
}

#[test]
fn test_concat_failure_halts_run() {
    let fx = fixture(2);
    let runner = ScriptedRunner::failing(&["merged"]);
    let request = AssemblyRequest::new(fx.clips.clone()).with_audio(&fx.audio);

    let result = pipeline(&fx.config, &runner, FixedProbe::default())
        .run(&request)
        .unwrap();

    assert_eq!(result.status, RunStatus::Failed);
    assert!(!result.is_success());
    assert!(result.final_artifact.is_none());
    assert!(result.has(StageName::Concatenate, StageStatus::Failed));
    assert!(result
        .error
        .as_deref()
        .unwrap()
        .starts_with("Stage concatenate failed"));
    assert_eq!(result.records_for(StageName::OverlayAudio).count(), 0);
    assert_eq!(result.records_for(StageName::Transitions).count(), 0);
    assert_eq!(
        stage_sequence(&runner.calls()),
        vec!["norm", "norm", "merged"]
    );
}

#[test]
fn test_concat_timeout_halts_run() {
    let fx = fixture(2);
    let runner = ScriptedRunner::timing_out(&["merged"]);
    let request = AssemblyRequest::new(fx.clips.clone()).with_audio(&fx.audio);

    let result = pipeline(&fx.config, &runner, FixedProbe::default())
        .run(&request)
        .unwrap();

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.has(StageName::Concatenate, StageStatus::Failed));
    assert!(result
        .error
        .as_deref()
        .unwrap()
        .contains("timed out"));
    assert_eq!(result.records_for(StageName::OverlayAudio).count(), 0);
    assert_eq!(result.records_for(StageName::Transitions).count(), 0);
    assert_eq!(
        stage_sequence(&runner.calls()),
        vec!["norm", "norm", "merged"]
    );
}

#[test]
fn test_normalize_timeout_substitutes_original_clip() {
    let fx = fixture(2);
    let runner = ScriptedRunner::timing_out(&["norm-000"]);
    let request = AssemblyRequest::new(fx.clips.clone());

    let result = pipeline(&fx.config, &runner, FixedProbe::default())
        .run(&request)
        .unwrap();

    assert_eq!(result.status, RunStatus::Completed);
    assert!(result.error.is_none());
    let normalize: Vec<_> = result.records_for(StageName::Normalize).collect();
    assert_eq!(normalize[0].status, StageStatus::Failed);
    assert_eq!(normalize[1].status, StageStatus::Ok);

    let list = std::fs::read_to_string(fx.config.output_dir.join("final/concat-list.txt")).unwrap();
    let lines: Vec<_> = list.lines().collect();
    assert!(lines[0].contains("clip-001.mp4"));
    assert!(lines[1].contains("norm-001.mp4"));
}

#[test]
fn test_overlay_timeout_keeps_silent_video() {
    let fx = fixture(1);
    let runner = ScriptedRunner::timing_out(&["with-audio"]);
    let probe = FixedProbe::with(&[("merged", 62.0), ("music", 55.0)]);
    let request = AssemblyRequest::new(fx.clips.clone())
        .with_audio(&fx.audio)
        .with_run_tag("t");

    let result = pipeline(&fx.config, &runner, probe).run(&request).unwrap();

    assert_eq!(result.status, RunStatus::Completed);
    assert!(result.has(StageName::OverlayAudio, StageStatus::Failed));
    assert!(matches!(result.sync, Some(SyncDecision::FadeAudio { .. })));

    let transitions_call = runner.calls().last().cloned().unwrap();
    assert!(transitions_call.args.iter().any(|a| a.ends_with("merged-t.mp4")));
    assert!(result.final_artifact.unwrap().ends_with("final-t.mp4"));
}

#[test]
fn test_transitions_failure_returns_previous_artifact() {
    let fx = fixture(2);
    let runner = ScriptedRunner::failing(&["final-"]);
    let request = AssemblyRequest::new(fx.clips.clone())
        .with_audio(&fx.audio)
        .with_run_tag("t");

    let result = pipeline(&fx.config, &runner, FixedProbe::default())
        .run(&request)
        .unwrap();

    assert_eq!(result.status, RunStatus::Completed);
    assert!(result.has(StageName::Transitions, StageStatus::Failed));
    assert!(result.final_artifact.unwrap().ends_with("with-audio-t.mp4"));
}

#[test]
fn test_unknown_duration_assumes_default_for_fade_out() {
    let fx = fixture(1);
    let runner = ScriptedRunner::default();
    let request = AssemblyRequest::new(fx.clips.clone());

    pipeline(&fx.config, &runner, FixedProbe::default())
        .run(&request)
        .unwrap();

    let transitions_call = runner.calls().last().cloned().unwrap();
    assert!(transitions_call
        .args
        .contains(&"fade=t=in:st=0:d=0.5,fade=t=out:st=179.5:d=0.5".to_string()));
}

#[test]
fn test_missing_audio_is_skipped() {
    let fx = fixture(1);
    let runner = ScriptedRunner::default();
    let request = AssemblyRequest::new(fx.clips.clone()).with_audio("/nonexistent/music.mp3");

    let result = pipeline(&fx.config, &runner, FixedProbe::default())
        .run(&request)
        .unwrap();

    assert_eq!(result.status, RunStatus::Completed);
    assert!(result.has(StageName::OverlayAudio, StageStatus::Skipped));
    assert!(result.sync.is_none());
    assert_eq!(
        stage_sequence(&runner.calls()),
        vec!["norm", "merged", "final"]
    );
}

#[test]
fn test_dry_run_invokes_nothing() {
    let fx = fixture(2);
    let runner = ScriptedRunner::default();
    let request = AssemblyRequest::new(fx.clips.clone())
        .with_audio(&fx.audio)
        .dry_run(true);

    let result = pipeline(&fx.config, &runner, FixedProbe::default())
        .run(&request)
        .unwrap();

    assert_eq!(result.status, RunStatus::DryRun);
    assert!(runner.calls().is_empty());
    assert!(result.stages.iter().all(|r| r.status == StageStatus::Skipped));
    assert_eq!(result.records_for(StageName::Normalize).count(), 2);
    assert!(result.final_artifact.is_none());
    assert!(!fx.config.output_dir.exists());
}

#[test]
fn test_no_clips_is_missing_artifact() {
    let fx = fixture(0);
    let runner = ScriptedRunner::default();

    let err = pipeline(&fx.config, &runner, FixedProbe::default())
        .run(&AssemblyRequest::new(vec![]))
        .unwrap_err();

    assert!(matches!(err, ReelforgeError::MissingArtifact { .. }));
    assert!(runner.calls().is_empty());
}

#[test]
fn test_vanished_clip_is_missing_artifact() {
    let fx = fixture(2);
    std::fs::remove_file(&fx.clips[1]).unwrap();
    let runner = ScriptedRunner::default();

    let err = pipeline(&fx.config, &runner, FixedProbe::default())
        .run(&AssemblyRequest::new(fx.clips.clone()))
        .unwrap_err();

    assert!(matches!(err, ReelforgeError::MissingArtifact { .. }));
    assert!(runner.calls().is_empty());
}

#[test]
fn test_result_json_round_trips_through_disk() {
    let fx = fixture(1);
    let runner = ScriptedRunner::default();
    let request = AssemblyRequest::new(fx.clips.clone()).with_run_tag("t");
    let result = pipeline(&fx.config, &runner, FixedProbe::default())
        .run(&request)
        .unwrap();

    let path = reelforge_assembly_engine::result_path(&fx.config, "t");
    result.write_json(&path).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(value["status"], "completed");
    assert_eq!(value["stages"][0]["stage"], "normalize");
    assert_eq!(value["stages"][2]["status"], "skipped");
}
