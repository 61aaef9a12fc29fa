//! Show how a video and an audio track would be reconciled.

use std::path::PathBuf;

use reelforge_assembly_engine::{DurationProbe, FfmpegProbe};
use reelforge_common::config::AppConfig;
use reelforge_timing_core::sync::{SyncDecision, SyncPolicy};

fn describe(secs: Option<f64>) -> String {
    secs.map(|s| format!("{s:.2}s"))
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn run(config: AppConfig, video: PathBuf, audio: PathBuf) -> anyhow::Result<()> {
    let probe = FfmpegProbe::new(config.ffmpeg_path.clone(), config.timeouts.probe());
    let video_secs = probe.probe(&video);
    let audio_secs = probe.probe(&audio);
    let decision = SyncPolicy::new(config.sync).decide(video_secs, audio_secs);

    println!("Video: {} ({})", video.display(), describe(video_secs));
    println!("Audio: {} ({})", audio.display(), describe(audio_secs));
    println!("Strategy: {}", decision.strategy());
    match decision {
        SyncDecision::Shortest => {}
        SyncDecision::PadVideo { pad_secs } => {
            println!("  Hold last frame for {pad_secs:.2}s");
        }
        SyncDecision::FadeAudio {
            fade_start_secs,
            fade_duration_secs,
        } => {
            println!("  Fade audio out at {fade_start_secs:.2}s over {fade_duration_secs:.2}s");
        }
    }
    println!(
        "Output length: {}",
        describe(decision.output_duration(video_secs, audio_secs))
    );

    Ok(())
}
