//! Print a media file's measured duration.

use std::path::PathBuf;

use reelforge_assembly_engine::{DurationProbe, FfmpegProbe};
use reelforge_common::config::AppConfig;

pub fn run(config: AppConfig, file: PathBuf) -> anyhow::Result<()> {
    if !file.exists() {
        anyhow::bail!("File not found: {}", file.display());
    }

    let probe = FfmpegProbe::new(config.ffmpeg_path.clone(), config.timeouts.probe());
    match probe.probe(&file) {
        Some(secs) => println!("{}: {secs:.2}s", file.display()),
        None => println!("{}: unknown", file.display()),
    }

    Ok(())
}
