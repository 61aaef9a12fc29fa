//! Interval segmentation: scene duration → bounded sub-clips.
//!
//! # Algorithm
//!
//! 1. A scene no longer than `max` becomes a single sub-clip, however short.
//! 2. Otherwise the duration is consumed greedily:
//!    - `remaining <= max`: take everything that is left;
//!    - `remaining <= max + min`: take `remaining / 2` (floor), so the tail is
//!      split into two near-equal halves instead of leaving a sliver below `min`;
//!    - otherwise take `max`.
//!
//!    Every take is clamped to at least `min`.
//! 3. Once the loop ends, the final count is stamped on every sub-clip.
//!
//! With the default bounds (8s / 4s) every sub-clip of a multi-clip scene
//! lies in `[4, 8]`, and durations always sum to the scene duration.

use reelforge_common::config::SegmentConfig;
use reelforge_common::error::{ReelforgeError, ReelforgeResult};
use reelforge_script_model::clip::SubClip;
use reelforge_script_model::scene::Scene;

/// Splits scenes into generation-sized sub-clips.
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmentConfig,
}

impl Segmenter {
    /// Create a segmenter with the given bounds.
    ///
    /// Bounds that fail [`SegmentConfig::validate`] are accepted but logged:
    /// durations still sum to the scene length, the floor may not hold.
    pub fn new(config: SegmentConfig) -> Self {
        if let Err(err) = config.validate() {
            tracing::warn!(error = %err, "Clip bounds cannot guarantee the minimum length");
        }
        Self { config }
    }

    /// Create a segmenter with the default 8s ceiling and 4s floor.
    pub fn with_defaults() -> Self {
        Self::new(SegmentConfig::default())
    }

    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }

    /// Sub-clip durations for a scene of `total_secs` seconds.
    ///
    /// `total_secs` must be positive; zero yields an empty list.
    pub fn durations(&self, total_secs: u32) -> Vec<u32> {
        let max = self.config.max_clip_secs;
        let min = self.config.min_clip_secs.max(1);

        if total_secs == 0 {
            return vec![];
        }
        if total_secs <= max {
            return vec![total_secs];
        }

        let mut durations = vec![];
        let mut remaining = total_secs;
        while remaining > 0 {
            let take = if remaining <= max {
                remaining
            } else if remaining <= max.saturating_add(min) {
                remaining / 2
            } else {
                max
            };
            // Clamp to the floor but never past what is left.
            let take = take.max(min).min(remaining);
            durations.push(take);
            remaining -= take;
        }
        durations
    }

    /// Split a scene with a known start and duration into sub-clips.
    pub fn split(
        &self,
        scene_id: &str,
        start_secs: u32,
        total_secs: u32,
    ) -> ReelforgeResult<Vec<SubClip>> {
        if total_secs == 0 {
            return Err(ReelforgeError::invalid_scene(scene_id, "duration must be positive"));
        }

        let durations = self.durations(total_secs);
        let sub_total = durations.len() as u32;
        let mut offset = start_secs;

        let clips = durations
            .into_iter()
            .enumerate()
            .map(|(i, duration_secs)| {
                let clip = SubClip {
                    scene_id: scene_id.to_string(),
                    sub_id: i as u32 + 1,
                    sub_total,
                    start_secs: offset,
                    duration_secs,
                };
                offset += duration_secs;
                clip
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            scene = scene_id,
            total_secs,
            sub_clips = clips.len(),
            "Scene segmented"
        );
        Ok(clips)
    }

    /// Split a scene using its own time range.
    ///
    /// Malformed ranges fall back to the default scene length; inverted or
    /// empty ranges are rejected as `InvalidScene`.
    pub fn split_scene(&self, scene: &Scene) -> ReelforgeResult<Vec<SubClip>> {
        let total_secs = scene.duration_secs()?;
        self.split(&scene.id, scene.start_secs(), total_secs)
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::with_defaults()
    }
}
