//! Application configuration.
//!
//! Every tunable constant of the segmenter, the synchronization policy and
//! the assembly pipeline lives here so callers can override it and tests
//! can probe boundary values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ReelforgeError, ReelforgeResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory under which run outputs are written.
    pub output_dir: PathBuf,

    /// ffmpeg binary used for probing and every pipeline stage.
    pub ffmpeg_path: String,

    /// Sub-clip length bounds.
    pub segment: SegmentConfig,

    /// Audio/video reconciliation thresholds.
    pub sync: SyncConfig,

    /// Target encoding parameters.
    pub render: RenderConfig,

    /// Per-stage tool timeouts.
    pub timeouts: StageTimeouts,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Bounds used when splitting a scene into generation-sized sub-clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Longest sub-clip the generator accepts (seconds).
    pub max_clip_secs: u32,

    /// Shortest sub-clip the generator accepts (seconds).
    pub min_clip_secs: u32,
}

/// Thresholds for choosing a reconciliation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Largest mismatch (seconds) that is resolved by trimming to the shorter track.
    pub tolerance_secs: f64,

    /// Length of the audio fade-out applied when video outlasts audio.
    pub fade_window_secs: f64,
}

/// Target format for normalized and transitioned output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output frame rate.
    pub fps: u32,

    /// Output resolution (width x height in pixels).
    pub width: u32,
    pub height: u32,

    /// x264 constant rate factor.
    pub crf: u8,

    /// Audio bitrate passed to the aac encoder (e.g. "192k").
    pub audio_bitrate: String,

    /// Fade-in / fade-out length of the transitions stage.
    pub transition_secs: f64,

    /// Duration assumed for the fade-out offset when probing fails.
    pub assumed_duration_secs: f64,
}

/// Upper bounds on each external tool invocation (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageTimeouts {
    pub probe_secs: u64,
    pub normalize_secs: u64,
    pub concat_secs: u64,
    pub overlay_secs: u64,
    pub transitions_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reelforge=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            ffmpeg_path: "ffmpeg".to_string(),
            segment: SegmentConfig::default(),
            sync: SyncConfig::default(),
            render: RenderConfig::default(),
            timeouts: StageTimeouts::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_clip_secs: 8,
            min_clip_secs: 4,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tolerance_secs: 2.0,
            fade_window_secs: 3.0,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            width: 1920,
            height: 1080,
            crf: 23,
            audio_bitrate: "192k".to_string(),
            transition_secs: 0.5,
            assumed_duration_secs: 180.0,
        }
    }
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            probe_secs: 15,
            normalize_secs: 120,
            concat_secs: 300,
            overlay_secs: 300,
            transitions_secs: 300,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl RenderConfig {
    /// Resolution in ffmpeg's `W:H` filter notation.
    pub fn resolution_arg(&self) -> String {
        format!("{}:{}", self.width, self.height)
    }
}

/// Parse a `WIDTHxHEIGHT` (or `WIDTH:HEIGHT`) resolution string.
pub fn parse_resolution(raw: &str) -> ReelforgeResult<(u32, u32)> {
    let (w, h) = raw
        .split_once(['x', 'X', ':'])
        .ok_or_else(|| ReelforgeError::config(format!("Malformed resolution: {raw}")))?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| ReelforgeError::config(format!("Malformed resolution width: {raw}")))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| ReelforgeError::config(format!("Malformed resolution height: {raw}")))?;
    if width == 0 || height == 0 {
        return Err(ReelforgeError::config(format!(
            "Resolution must be non-zero: {raw}"
        )));
    }
    Ok((width, height))
}

impl StageTimeouts {
    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }

    pub fn normalize(&self) -> Duration {
        Duration::from_secs(self.normalize_secs)
    }

    pub fn concat(&self) -> Duration {
        Duration::from_secs(self.concat_secs)
    }

    pub fn overlay(&self) -> Duration {
        Duration::from_secs(self.overlay_secs)
    }

    pub fn transitions(&self) -> Duration {
        Duration::from_secs(self.transitions_secs)
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit file. Missing fields take their defaults.
    pub fn load_from(path: impl AsRef<Path>) -> ReelforgeResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ReelforgeError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Reject settings the segmenter, policy or pipeline cannot honour.
    pub fn validate(&self) -> ReelforgeResult<()> {
        self.segment.validate()?;
        self.sync.validate()?;

        if self.render.fps == 0 {
            return Err(ReelforgeError::config("render.fps must be positive"));
        }
        if self.render.width == 0 || self.render.height == 0 {
            return Err(ReelforgeError::config("render resolution must be non-zero"));
        }
        if !(self.render.transition_secs >= 0.0) {
            return Err(ReelforgeError::config(
                "render.transition_secs must be non-negative",
            ));
        }
        if !(self.render.assumed_duration_secs > 0.0) {
            return Err(ReelforgeError::config(
                "render.assumed_duration_secs must be positive",
            ));
        }

        let t = &self.timeouts;
        if [
            t.probe_secs,
            t.normalize_secs,
            t.concat_secs,
            t.overlay_secs,
            t.transitions_secs,
        ]
        .contains(&0)
        {
            return Err(ReelforgeError::config("stage timeouts must be positive"));
        }

        if self.ffmpeg_path.trim().is_empty() {
            return Err(ReelforgeError::config("ffmpeg_path must not be empty"));
        }
        Ok(())
    }
}

impl SegmentConfig {
    pub fn validate(&self) -> ReelforgeResult<()> {
        if self.min_clip_secs == 0 {
            return Err(ReelforgeError::config("segment.min_clip_secs must be positive"));
        }
        if self.min_clip_secs >= self.max_clip_secs {
            return Err(ReelforgeError::config(format!(
                "segment.min_clip_secs ({}) must be less than max_clip_secs ({})",
                self.min_clip_secs, self.max_clip_secs
            )));
        }
        // Below this the two-way tail split can leave a clip under the floor.
        if 2 * u64::from(self.min_clip_secs) > u64::from(self.max_clip_secs) + 1 {
            return Err(ReelforgeError::config(format!(
                "segment.min_clip_secs ({}) must be at most (max_clip_secs + 1) / 2 ({})",
                self.min_clip_secs,
                (u64::from(self.max_clip_secs) + 1) / 2
            )));
        }
        Ok(())
    }
}

impl SyncConfig {
    pub fn validate(&self) -> ReelforgeResult<()> {
        if !(self.tolerance_secs >= 0.0) {
            return Err(ReelforgeError::config("sync.tolerance_secs must be non-negative"));
        }
        if !(self.fade_window_secs >= 0.0) {
            return Err(ReelforgeError::config(
                "sync.fade_window_secs must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reelforge").join("config.json")
}
