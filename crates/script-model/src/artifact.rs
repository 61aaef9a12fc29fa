//! Media artifacts handed between pipeline stages.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Kind of media held by an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Video,
    Audio,
}

/// A media file on disk plus what is known about it.
///
/// Artifacts are never modified in place; a stage that transforms one
/// produces a new artifact at a new path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaArtifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,

    /// Measured playable duration; `None` when unmeasured or unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

impl MediaArtifact {
    pub fn video(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ArtifactKind::Video,
            duration_secs: None,
        }
    }

    pub fn audio(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ArtifactKind::Audio,
            duration_secs: None,
        }
    }

    /// Same artifact with a measured duration attached.
    pub fn with_duration(mut self, duration_secs: Option<f64>) -> Self {
        self.duration_secs = duration_secs;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Size on disk in megabytes, if the file exists.
    pub fn size_mb(&self) -> Option<f64> {
        let meta = std::fs::metadata(&self.path).ok()?;
        Some(meta.len() as f64 / (1024.0 * 1024.0))
    }
}
