//! Script-wide clip planning.
//!
//! Segments every scene of a script and numbers the resulting sub-clips in
//! playback order. The generated file name carries a zero-padded global index
//! so that sorting generated clips by file name reproduces plan order.

use reelforge_common::config::SegmentConfig;
use reelforge_common::error::ReelforgeResult;
use reelforge_script_model::clip::{Continuity, SubClip};
use reelforge_script_model::scene::Scene;
use serde::{Deserialize, Serialize};

use crate::segmenter::Segmenter;

/// A sub-clip with its position in the whole script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedClip {
    /// 1-based index across all scenes.
    pub clip_idx: u32,

    #[serde(flatten)]
    pub sub_clip: SubClip,

    pub continuity: Continuity,

    /// File name the generated clip should be saved under.
    pub file_name: String,
}

/// Ordered generation plan for a whole script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipPlan {
    pub clips: Vec<PlannedClip>,
}

impl ClipPlan {
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Sum of all sub-clip durations.
    pub fn total_secs(&self) -> u64 {
        self.clips
            .iter()
            .map(|c| u64::from(c.sub_clip.duration_secs))
            .sum()
    }

    /// Sub-clips belonging to one scene, in order.
    pub fn for_scene<'a>(&'a self, scene_id: &'a str) -> impl Iterator<Item = &'a PlannedClip> + 'a {
        self.clips
            .iter()
            .filter(move |c| c.sub_clip.scene_id == scene_id)
    }
}

/// File name for a generated sub-clip.
pub fn clip_file_name(clip_idx: u32, sub_clip: &SubClip) -> String {
    format!(
        "clip-{clip_idx:03}_scene-{}_sub-{}.mp4",
        sanitize_component(&sub_clip.scene_id),
        sub_clip.sub_id
    )
}

fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Segment every scene and number the result.
///
/// Fails with `Config` when the clip bounds cannot hold their floor, and with
/// `InvalidScene` on the first scene whose range is inverted or empty.
pub fn plan_clips(scenes: &[Scene], config: &SegmentConfig) -> ReelforgeResult<ClipPlan> {
    config.validate()?;
    let segmenter = Segmenter::new(*config);
    let mut clips = vec![];

    for scene in scenes {
        for sub_clip in segmenter.split_scene(scene)? {
            let clip_idx = clips.len() as u32 + 1;
            clips.push(PlannedClip {
                clip_idx,
                continuity: sub_clip.continuity(),
                file_name: clip_file_name(clip_idx, &sub_clip),
                sub_clip,
            });
        }
    }

    tracing::info!(
        scenes = scenes.len(),
        clips = clips.len(),
        "Clip plan built"
    );
    Ok(ClipPlan { clips })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelforge_common::error::ReelforgeError;

    fn scenes() -> Vec<Scene> {
        vec![
            Scene::new("1", "0:00-0:20"),
            Scene::new("2", "0:20-0:27"),
            Scene::new("3", "0:27-0:40"),
        ]
    }

    #[test]
    fn test_plan_numbers_clips_across_scenes() {
        let plan = plan_clips(&scenes(), &SegmentConfig::default()).unwrap();

        assert_eq!(plan.len(), 6);
        let idx: Vec<u32> = plan.clips.iter().map(|c| c.clip_idx).collect();
        assert_eq!(idx, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(plan.total_secs(), 40);

        let durations: Vec<u32> = plan
            .clips
            .iter()
            .map(|c| c.sub_clip.duration_secs)
            .collect();
        assert_eq!(durations, vec![8, 6, 6, 7, 8, 5]);

        assert_eq!(plan.clips[0].file_name, "clip-001_scene-1_sub-1.mp4");
        assert_eq!(plan.clips[5].file_name, "clip-006_scene-3_sub-2.mp4");
        assert_eq!(plan.clips[3].continuity, Continuity::Single);
        assert_eq!(plan.clips[1].continuity, Continuity::Continuing);
    }

    #[test]
    fn test_file_names_sort_in_plan_order() {
        let many: Vec<Scene> = (0..15)
            .map(|i| Scene::new(i.to_string(), "0:00-0:20"))
            .collect();
        let plan = plan_clips(&many, &SegmentConfig::default()).unwrap();

        let mut names: Vec<&str> = plan.clips.iter().map(|c| c.file_name.as_str()).collect();
        let original = names.clone();
        names.sort();
        assert_eq!(names, original);
    }

    #[test]
    fn test_invalid_scene_aborts_plan() {
        let mut input = scenes();
        input.push(Scene::new("bad", "1:00-0:10"));
        let err = plan_clips(&input, &SegmentConfig::default()).unwrap_err();
        assert!(matches!(err, ReelforgeError::InvalidScene { ref scene, .. } if scene == "bad"));
    }

    #[test]
    fn test_for_scene_filters() {
        let plan = plan_clips(&scenes(), &SegmentConfig::default()).unwrap();
        assert_eq!(plan.for_scene("1").count(), 3);
        assert_eq!(plan.for_scene("2").count(), 1);
        assert_eq!(plan.for_scene("missing").count(), 0);
    }

    #[test]
    fn test_scene_id_is_sanitized_in_file_name() {
        let plan = plan_clips(
            &[Scene::new("intro/1 a", "0:00-0:05")],
            &SegmentConfig::default(),
        )
        .unwrap();
        assert_eq!(plan.clips[0].file_name, "clip-001_scene-intro_1_a_sub-1.mp4");
    }

    #[test]
    fn test_planned_clip_serializes_flat() {
        let plan = plan_clips(&scenes()[..1], &SegmentConfig::default()).unwrap();
        let json = serde_json::to_value(&plan.clips[1]).unwrap();
        assert_eq!(json["scene_id"], "1");
        assert_eq!(json["sub_id"], 2);
        assert_eq!(json["sub_total"], 3);
        assert_eq!(json["start_secs"], 8);
        assert_eq!(json["duration_secs"], 6);
        assert_eq!(json["continuity"], "continuing");
    }

    #[test]
    fn test_plan_rejects_bounds_that_break_the_floor() {
        let config = SegmentConfig {
            max_clip_secs: 5,
            min_clip_secs: 4,
        };
        let err = plan_clips(&[Scene::new("1", "0:00-0:06")], &config).unwrap_err();
        assert!(matches!(err, ReelforgeError::Config { .. }));
    }
}
