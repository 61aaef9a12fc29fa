//! ffmpeg argument builders.
//!
//! Pure functions from paths and settings to argument vectors, kept apart
//! from execution so every command line can be checked in unit tests.

use std::path::{Path, PathBuf};

use reelforge_common::config::RenderConfig;
use reelforge_timing_core::sync::SyncDecision;

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Format seconds for filter expressions without float noise (`5`, `0.5`, `52.25`).
pub fn secs_arg(secs: f64) -> String {
    let fixed = format!("{secs:.3}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn strings<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Decode a file to nowhere so ffmpeg reports its container duration.
pub fn probe_args(input: &Path) -> Vec<String> {
    let mut args = strings(["-i"]);
    args.push(path_arg(input));
    args.extend(strings(["-hide_banner", "-f", "null", "-"]));
    args
}

/// Re-encode one clip to the common codec, frame rate, resolution and pixel
/// format, letterboxing to keep its aspect ratio and dropping any audio.
pub fn normalize_args(input: &Path, output: &Path, render: &RenderConfig) -> Vec<String> {
    let res = render.resolution_arg();
    let filter = format!(
        "scale={res}:force_original_aspect_ratio=decrease,pad={res}:(ow-iw)/2:(oh-ih)/2:color=black"
    );

    let mut args = strings(["-y", "-i"]);
    args.push(path_arg(input));
    args.extend(strings(["-c:v", "libx264", "-preset", "fast", "-crf"]));
    args.push(render.crf.to_string());
    args.push("-r".to_string());
    args.push(render.fps.to_string());
    args.push("-vf".to_string());
    args.push(filter);
    args.extend(strings(["-pix_fmt", "yuv420p", "-an", "-movflags", "+faststart"]));
    args.push(path_arg(output));
    args
}

/// Escape a path for a single-quoted concat demuxer entry.
pub fn escape_concat_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', "'\\''")
}

/// Concat demuxer list with one `file '<path>'` line per clip.
pub fn concat_list(clips: &[PathBuf]) -> String {
    clips
        .iter()
        .map(|clip| format!("file '{}'\n", escape_concat_path(clip)))
        .collect()
}

/// Join the clips listed in `list_file` into one H.264 video.
pub fn concat_args(list_file: &Path, output: &Path, render: &RenderConfig) -> Vec<String> {
    let mut args = strings(["-y", "-f", "concat", "-safe", "0", "-i"]);
    args.push(path_arg(list_file));
    args.extend(strings(["-c:v", "libx264", "-preset", "medium", "-crf"]));
    args.push(render.crf.to_string());
    args.extend(strings(["-pix_fmt", "yuv420p", "-movflags", "+faststart"]));
    args.push(path_arg(output));
    args
}

/// Merge a silent video with an audio track according to `decision`.
pub fn overlay_args(
    video: &Path,
    audio: &Path,
    output: &Path,
    decision: &SyncDecision,
    render: &RenderConfig,
) -> Vec<String> {
    let mut args = strings(["-y", "-i"]);
    args.push(path_arg(video));
    args.push("-i".to_string());
    args.push(path_arg(audio));

    match decision {
        SyncDecision::PadVideo { pad_secs } => {
            args.push("-filter_complex".to_string());
            args.push(format!(
                "[0:v]tpad=stop_mode=clone:stop_duration={}[v]",
                secs_arg(*pad_secs)
            ));
            args.extend(strings(["-map", "[v]", "-map", "1:a:0"]));
            args.extend(strings(["-c:v", "libx264", "-preset", "fast", "-crf"]));
            args.push(render.crf.to_string());
            args.extend(strings(["-c:a", "aac", "-b:a"]));
            args.push(render.audio_bitrate.clone());
            args.push("-shortest".to_string());
        }
        SyncDecision::FadeAudio {
            fade_start_secs,
            fade_duration_secs,
        } => {
            args.extend(strings(["-c:v", "copy", "-af"]));
            args.push(format!(
                "afade=t=out:st={}:d={}",
                secs_arg(*fade_start_secs),
                secs_arg(*fade_duration_secs)
            ));
            args.extend(strings(["-c:a", "aac", "-b:a"]));
            args.push(render.audio_bitrate.clone());
            args.extend(strings(["-map", "0:v:0", "-map", "1:a:0"]));
        }
        SyncDecision::Shortest => {
            args.extend(strings(["-c:v", "copy", "-c:a", "aac", "-b:a"]));
            args.push(render.audio_bitrate.clone());
            args.extend(strings(["-map", "0:v:0", "-map", "1:a:0", "-shortest"]));
        }
    }

    args.extend(strings(["-movflags", "+faststart"]));
    args.push(path_arg(output));
    args
}

/// Fade in from black at the start and out to black at `total_secs`.
pub fn transition_args(
    input: &Path,
    output: &Path,
    fade_secs: f64,
    total_secs: f64,
) -> Vec<String> {
    let fade_out_start = (total_secs - fade_secs).max(0.0);
    let fade = secs_arg(fade_secs);

    let mut args = strings(["-y", "-i"]);
    args.push(path_arg(input));
    args.push("-vf".to_string());
    args.push(format!(
        "fade=t=in:st=0:d={fade},fade=t=out:st={}:d={fade}",
        secs_arg(fade_out_start)
    ));
    args.extend(strings(["-c:a", "copy"]));
    args.push(path_arg(output));
    args
}
