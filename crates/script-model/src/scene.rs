//! Scenes and their `M:SS-M:SS` time ranges.

use std::fmt;

use reelforge_common::error::{ReelforgeError, ReelforgeResult};
use serde::{Deserialize, Deserializer, Serialize};

/// Duration used when a scene's range cannot be parsed at all.
pub const DEFAULT_SCENE_SECS: u32 = 10;

/// Range assumed for scenes that omit the `timestamp` field.
pub const DEFAULT_TIMESTAMP: &str = "0:00-0:08";

/// Parse a `M:SS` clock reading into whole seconds.
///
/// Minutes may have any number of digits; seconds must be below 60.
pub fn parse_clock(raw: &str) -> Option<u32> {
    let (minutes, seconds) = raw.trim().split_once(':')?;
    if minutes.is_empty() || seconds.is_empty() {
        return None;
    }
    let minutes = minutes.parse::<u32>().ok()?;
    let seconds = seconds.parse::<u32>().ok()?;
    if seconds >= 60 {
        return None;
    }
    minutes.checked_mul(60)?.checked_add(seconds)
}

/// A scene's nominal placement on the content timeline, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    pub start_secs: u32,
    pub end_secs: u32,
}

impl TimeRange {
    /// Parse `M:SS-M:SS`.
    ///
    /// Returns `None` when the text is not shaped like a range. A well-formed
    /// range may still be empty or inverted; see [`TimeRange::duration_secs`].
    pub fn parse(raw: &str) -> Option<Self> {
        let (start, end) = raw.split_once('-')?;
        Some(Self {
            start_secs: parse_clock(start)?,
            end_secs: parse_clock(end)?,
        })
    }

    /// Signed length of the range.
    pub fn duration_secs(&self) -> i64 {
        i64::from(self.end_secs) - i64::from(self.start_secs)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{:02}-{}:{:02}",
            self.start_secs / 60,
            self.start_secs % 60,
            self.end_secs / 60,
            self.end_secs % 60
        )
    }
}

/// One scene of a content script.
///
/// `attributes` holds every descriptive field (characters, background,
/// mood, lyrics section, ...) and is never interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Scene identifier; numeric ids are normalised to their decimal text.
    #[serde(deserialize_with = "deserialize_scene_id")]
    pub id: String,

    /// Raw `M:SS-M:SS` range as authored.
    #[serde(default = "default_timestamp")]
    pub timestamp: String,

    /// Opaque pass-through payload.
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

fn default_timestamp() -> String {
    DEFAULT_TIMESTAMP.to_string()
}

fn deserialize_scene_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "scene id must be a string or number, got {other}"
        ))),
    }
}

impl Scene {
    pub fn new(id: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp: timestamp.into(),
            attributes: serde_json::Map::new(),
        }
    }

    /// The parsed range, if the timestamp is well formed.
    pub fn time_range(&self) -> Option<TimeRange> {
        TimeRange::parse(&self.timestamp)
    }

    /// Offset of the scene on the content timeline; 0 when the range is malformed.
    pub fn start_secs(&self) -> u32 {
        self.time_range().map(|r| r.start_secs).unwrap_or(0)
    }

    /// Scene length in seconds.
    ///
    /// A malformed range degrades to [`DEFAULT_SCENE_SECS`]. A well-formed
    /// range whose end does not follow its start is an `InvalidScene`.
    pub fn duration_secs(&self) -> ReelforgeResult<u32> {
        let Some(range) = self.time_range() else {
            return Ok(DEFAULT_SCENE_SECS);
        };
        let duration = range.duration_secs();
        if duration <= 0 {
            return Err(ReelforgeError::invalid_scene(
                &self.id,
                format!("time range {} has non-positive duration {duration}s", self.timestamp),
            ));
        }
        u32::try_from(duration).map_err(|_| {
            ReelforgeError::invalid_scene(&self.id, format!("time range {} too long", self.timestamp))
        })
    }

    /// Strict variant of [`Scene::duration_secs`]: malformed ranges are rejected too.
    pub fn strict_duration_secs(&self) -> ReelforgeResult<u32> {
        if self.time_range().is_none() {
            return Err(ReelforgeError::invalid_scene(
                &self.id,
                format!("unparseable time range {:?}", self.timestamp),
            ));
        }
        self.duration_secs()
    }
}
