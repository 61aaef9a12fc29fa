//! Reelforge CLI: plan scene clips and assemble the final video.
//!
//! Usage:
//!   reelforge plan <SCRIPT>                 Print the clip plan for a content script
//!   reelforge assemble --clips-dir <DIR>    Normalize, join, add music and fades
//!   reelforge probe <FILE>                  Print a media file's duration
//!   reelforge sync <VIDEO> <AUDIO>          Show how two tracks would be reconciled
//!   reelforge check                         Check that ffmpeg is available
//!   reelforge config                        Show the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reelforge_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "reelforge",
    about = "Scene segmentation and ffmpeg video assembly",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Configuration file (defaults to the standard location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split every scene of a content script into generation-sized clips
    Plan {
        /// Path to the content script JSON
        script: PathBuf,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,

        /// Maximum clip length (seconds)
        #[arg(long)]
        max_clip: Option<u32>,

        /// Minimum clip length (seconds)
        #[arg(long)]
        min_clip: Option<u32>,
    },

    /// Assemble generated clips and an optional music track into one video
    Assemble {
        /// Directory holding the generated clips
        #[arg(long)]
        clips_dir: PathBuf,

        /// Music track to overlay
        #[arg(long)]
        audio: Option<PathBuf>,

        /// Output directory (overrides the configured one)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Report what would run without invoking ffmpeg
        #[arg(long)]
        dry_run: bool,

        /// Print the result as JSON instead of writing it next to the outputs
        #[arg(long)]
        json: bool,

        /// Target FPS
        #[arg(long)]
        fps: Option<u32>,

        /// Target resolution, e.g. 1080x1920
        #[arg(long)]
        resolution: Option<String>,
    },

    /// Measure the duration of a media file
    Probe {
        /// Media file to inspect
        file: PathBuf,
    },

    /// Show the audio/video reconciliation strategy for two files
    Sync {
        /// Video file
        video: PathBuf,

        /// Audio file
        audio: PathBuf,
    },

    /// Check that the configured ffmpeg binary can be run
    Check,

    /// Show the effective configuration
    Config {
        /// Write it to the standard location
        #[arg(long)]
        write: bool,
    },
}

fn load_config(explicit: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    match explicit {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display())),
        None => Ok(AppConfig::load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_ref())?;

    // Initialize logging
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.log_json {
        config.logging.json = true;
    }
    reelforge_common::logging::init_logging(&config.logging);
    tracing::debug!(
        config_file = ?cli.config,
        output_dir = %config.output_dir.display(),
        ffmpeg = %config.ffmpeg_path,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Plan {
            script,
            json,
            max_clip,
            min_clip,
        } => commands::plan::run(config, script, json, max_clip, min_clip),
        Commands::Assemble {
            clips_dir,
            audio,
            output_dir,
            dry_run,
            json,
            fps,
            resolution,
        } => {
            commands::assemble::run(
                config,
                commands::assemble::AssembleArgs {
                    clips_dir,
                    audio,
                    output_dir,
                    dry_run,
                    json,
                    fps,
                    resolution,
                },
            )
            .await
        }
        Commands::Probe { file } => commands::probe::run(config, file),
        Commands::Sync { video, audio } => commands::sync::run(config, video, audio),
        Commands::Check => commands::check::run(config),
        Commands::Config { write } => commands::config::run(config, write),
    }
}
