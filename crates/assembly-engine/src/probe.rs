//! Duration probing.
//!
//! The probe decodes the file with `ffmpeg -i <path> -f null -` and reads the
//! `Duration: HH:MM:SS.CC` line ffmpeg prints to stderr. Any failure (tool
//! missing, non-zero exit, timeout, no marker) yields `None`: an unknown
//! duration is an expected outcome, never an error.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::commands;
use crate::runner::{ProcessRunner, ToolInvocation, ToolRunner};

/// Measures the playable duration of media files.
pub trait DurationProbe: Send + Sync {
    /// Duration in seconds, or `None` when it cannot be determined.
    fn probe(&self, path: &Path) -> Option<f64>;
}

/// Probe backed by the ffmpeg binary.
#[derive(Debug, Clone)]
pub struct FfmpegProbe<R = ProcessRunner> {
    runner: R,
    ffmpeg_path: String,
    timeout: Duration,
}

impl FfmpegProbe<ProcessRunner> {
    pub fn new(ffmpeg_path: impl Into<String>, timeout: Duration) -> Self {
        Self::with_runner(ProcessRunner::new(), ffmpeg_path, timeout)
    }
}

impl<R: ToolRunner> FfmpegProbe<R> {
    pub fn with_runner(runner: R, ffmpeg_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            runner,
            ffmpeg_path: ffmpeg_path.into(),
            timeout,
        }
    }
}

impl<R: ToolRunner> DurationProbe for FfmpegProbe<R> {
    fn probe(&self, path: &Path) -> Option<f64> {
        let invocation = ToolInvocation::new(
            self.ffmpeg_path.clone(),
            commands::probe_args(path),
            self.timeout,
        );

        // ffmpeg prints the container header even when decoding later fails,
        // so the exit status is not consulted.
        let output = match self.runner.run(&invocation) {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Cannot measure duration");
                return None;
            }
        };

        let duration = parse_duration_marker(&output.stderr);
        if duration.is_none() {
            tracing::warn!(path = %path.display(), "No duration marker in ffmpeg output");
        }
        duration
    }
}

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Duration: (\d{2}):(\d{2}):(\d{2})\.(\d{2})")
            .expect("duration pattern is a valid regex")
    })
}

/// Extract the first `Duration: HH:MM:SS.CC` marker as seconds.
pub fn parse_duration_marker(text: &str) -> Option<f64> {
    let caps = duration_regex().captures(text)?;
    let field = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
    let hours = field(1)?;
    let minutes = field(2)?;
    let seconds = field(3)?;
    let centis = field(4)?;
    Some(
        f64::from(hours) * 3600.0
            + f64::from(minutes) * 60.0
            + f64::from(seconds)
            + f64::from(centis) / 100.0,
    )
}
