//! Sub-clips: generation-sized slices of a scene.

use serde::{Deserialize, Serialize};

/// One bounded slice of a scene, sized for a single generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubClip {
    /// Identifier of the owning scene.
    pub scene_id: String,

    /// 1-based position within the scene.
    pub sub_id: u32,

    /// Number of sub-clips the scene was split into.
    pub sub_total: u32,

    /// Absolute start on the content timeline (seconds).
    pub start_secs: u32,

    /// Length of this slice (seconds).
    pub duration_secs: u32,
}

/// Where a sub-clip sits within its scene.
///
/// Prompt builders use this to ask for an establishing shot, a continuation,
/// or a closing beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Continuity {
    Single,
    Opening,
    Continuing,
    Closing,
}

impl SubClip {
    /// End of the slice on the content timeline.
    pub fn end_secs(&self) -> u32 {
        self.start_secs + self.duration_secs
    }

    pub fn continuity(&self) -> Continuity {
        if self.sub_total <= 1 {
            Continuity::Single
        } else if self.sub_id == 1 {
            Continuity::Opening
        } else if self.sub_id == self.sub_total {
            Continuity::Closing
        } else {
            Continuity::Continuing
        }
    }

    /// Short label such as `3.2/4` for logs and tables.
    pub fn label(&self) -> String {
        format!("{}.{}/{}", self.scene_id, self.sub_id, self.sub_total)
    }
}
