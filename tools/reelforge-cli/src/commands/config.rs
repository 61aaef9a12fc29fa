//! Show or write the effective configuration.

use reelforge_common::config::{config_file_path, AppConfig};

pub fn run(config: AppConfig, write: bool) -> anyhow::Result<()> {
    if write {
        config.save()?;
        println!("Wrote {}", config_file_path().display());
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
