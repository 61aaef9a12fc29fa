//! Print the clip plan for a content script.

use std::path::PathBuf;

use reelforge_common::config::AppConfig;
use reelforge_script_model::ContentScript;
use reelforge_timing_core::plan_clips;

pub fn run(
    config: AppConfig,
    script: PathBuf,
    json: bool,
    max_clip: Option<u32>,
    min_clip: Option<u32>,
) -> anyhow::Result<()> {
    let mut segment = config.segment;
    if let Some(max) = max_clip {
        segment.max_clip_secs = max;
    }
    if let Some(min) = min_clip {
        segment.min_clip_secs = min;
    }
    segment.validate()?;

    let script = ContentScript::load(&script)
        .map_err(|e| anyhow::anyhow!("Failed to load script: {e}"))?;
    let plan = plan_clips(&script.scenes, &segment)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("Clip plan: {}", script.title_or_default());
    println!(
        "  Scenes: {}  Clips: {}  Total: {}s  (clip length {}-{}s)",
        script.scenes.len(),
        plan.len(),
        plan.total_secs(),
        segment.min_clip_secs,
        segment.max_clip_secs
    );
    println!();
    println!(
        "  {:>4}  {:<10} {:>6} {:>5}  {:<11} File",
        "#", "Clip", "Start", "Len", "Continuity"
    );
    for clip in &plan.clips {
        println!(
            "  {:>4}  {:<10} {:>5}s {:>4}s  {:<11} {}",
            clip.clip_idx,
            clip.sub_clip.label(),
            clip.sub_clip.start_secs,
            clip.sub_clip.duration_secs,
            format!("{:?}", clip.continuity).to_lowercase(),
            clip.file_name
        );
    }

    Ok(())
}
