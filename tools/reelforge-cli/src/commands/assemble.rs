//! Assemble generated clips into the final video.

use std::path::PathBuf;

use reelforge_assembly_engine::{
    assemble_video, discover_clips, result_path, run_tag_now, AssemblyRequest, AssemblyResult,
    RunStatus, StageStatus,
};
use reelforge_common::config::{parse_resolution, AppConfig};

pub struct AssembleArgs {
    pub clips_dir: PathBuf,
    pub audio: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub dry_run: bool,
    pub json: bool,
    pub fps: Option<u32>,
    pub resolution: Option<String>,
}

pub async fn run(mut config: AppConfig, args: AssembleArgs) -> anyhow::Result<()> {
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(fps) = args.fps {
        config.render.fps = fps;
    }
    if let Some(resolution) = &args.resolution {
        let (width, height) = parse_resolution(resolution)?;
        config.render.width = width;
        config.render.height = height;
    }
    config.validate()?;

    let clips = discover_clips(&args.clips_dir)?;
    if !args.json {
        println!(
            "Assembling {} clip(s) from: {}",
            clips.len(),
            args.clips_dir.display()
        );
        match &args.audio {
            Some(audio) => println!("  Audio: {}", audio.display()),
            None => println!("  Audio: none"),
        }
        println!("  Output: {}", config.output_dir.display());
    }

    let tag = run_tag_now();
    let mut request = AssemblyRequest::new(clips)
        .dry_run(args.dry_run)
        .with_run_tag(tag.clone());
    if let Some(audio) = args.audio {
        request = request.with_audio(audio);
    }

    let summary_path = result_path(&config, &tag);
    let result = assemble_video(config, request)
        .await
        .map_err(|e| anyhow::anyhow!("Assembly could not start: {e}"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
        if result.status != RunStatus::DryRun {
            result.write_json(&summary_path)?;
            println!("  Summary: {}", summary_path.display());
        }
    }

    if result.status == RunStatus::Failed {
        anyhow::bail!("assembly failed");
    }
    Ok(())
}

fn print_summary(result: &AssemblyResult) {
    println!();
    for record in &result.stages {
        let tag = match record.status {
            StageStatus::Ok => "[OK]  ",
            StageStatus::Failed => "[FAIL]",
            StageStatus::Skipped => "[SKIP]",
        };
        let target = record
            .subject
            .as_ref()
            .or(record.artifact.as_ref())
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        println!("{tag} {:<14} {target}", record.stage.as_str());
        if let Some(detail) = &record.detail {
            println!("       {detail}");
        }
    }

    println!();
    if let Some(sync) = &result.sync {
        println!("Sync strategy: {}", sync.strategy());
    }
    match (&result.final_artifact, result.file_size_mb) {
        (Some(path), Some(size)) => println!("Final video: {} ({size:.1} MB)", path.display()),
        (Some(path), None) => println!("Final video: {}", path.display()),
        (None, _) => {}
    }
    if let Some(error) = &result.error {
        println!("Error: {error}");
    }
    println!("Status: {}", result.status);
}
