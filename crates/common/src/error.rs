//! Error types shared across Reelforge crates.

use std::path::PathBuf;

/// Top-level error type for Reelforge operations.
#[derive(Debug, thiserror::Error)]
pub enum ReelforgeError {
    /// A scene whose duration is non-positive or cannot be determined.
    #[error("Invalid scene {scene}: {message}")]
    InvalidScene { scene: String, message: String },

    /// A required input artifact is absent (e.g. no clips to aggregate).
    #[error("Missing artifact: {message}")]
    MissingArtifact { message: String },

    /// An external tool invocation failed for a pipeline stage.
    #[error("Stage {stage} failed: {message}")]
    Stage { stage: String, message: String },

    #[error("Script error: {message}")]
    Script { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ReelforgeError.
pub type ReelforgeResult<T> = Result<T, ReelforgeError>;

impl ReelforgeError {
    pub fn invalid_scene(scene: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidScene {
            scene: scene.into(),
            message: msg.into(),
        }
    }

    pub fn missing_artifact(msg: impl Into<String>) -> Self {
        Self::MissingArtifact {
            message: msg.into(),
        }
    }

    pub fn stage(stage: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: msg.into(),
        }
    }

    pub fn script(msg: impl Into<String>) -> Self {
        Self::Script {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
