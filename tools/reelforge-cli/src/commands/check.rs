//! Check that the configured ffmpeg binary can be run.

use reelforge_assembly_engine::runner::{tool_available, ProcessRunner};
use reelforge_common::config::{config_file_path, AppConfig};

pub fn run(config: AppConfig) -> anyhow::Result<()> {
    println!("Reelforge System Check");
    println!("{}", "=".repeat(50));

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[OK] Config: defaults ({} not found)", config_path.display());
    }

    let ffmpeg_ok = tool_available(&ProcessRunner::new(), &config.ffmpeg_path);
    if ffmpeg_ok {
        println!("[OK] ffmpeg: {}", config.ffmpeg_path);
    } else {
        println!("[FAIL] ffmpeg: '{}' could not be run", config.ffmpeg_path);
    }

    println!(
        "     Target: {}x{} @ {} fps",
        config.render.width, config.render.height, config.render.fps
    );

    println!();
    if ffmpeg_ok {
        println!("ffmpeg is available. Reelforge is ready.");
        Ok(())
    } else {
        anyhow::bail!("ffmpeg is required; install it or set ffmpeg_path in the config")
    }
}
