//! Content script loading.
//!
//! A script is the JSON document produced upstream by the content author;
//! this crate only reads its `title` and `scenes`, keeping the rest as-is.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scene::Scene;

/// Errors related to reading a script from disk.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("IO error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error at {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Script at {path} contains no scenes")]
    NoScenes { path: PathBuf },
}

impl From<ScriptError> for reelforge_common::ReelforgeError {
    fn from(err: ScriptError) -> Self {
        Self::script(err.to_string())
    }
}

/// A scene-structured content script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentScript {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub scenes: Vec<Scene>,

    /// Lyrics, SEO metadata, music direction and anything else upstream wrote.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ContentScript {
    /// Load a script from a JSON file. A script without scenes is rejected.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ScriptError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let script: Self = serde_json::from_str(&content).map_err(|e| ScriptError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        if script.scenes.is_empty() {
            return Err(ScriptError::NoScenes {
                path: path.to_path_buf(),
            });
        }
        Ok(script)
    }

    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }
}
