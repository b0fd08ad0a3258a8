//! Configuration commands.

use super::AppContext;
use anyhow::{Context, Result};
use atlas_config::Config;
use colored::Colorize;
use std::path::Path;

pub fn show(config_path: Option<&Path>) -> Result<()> {
    let config_file = super::config_file(config_path)?;

    println!("{}", "Current Configuration".cyan().bold());
    println!("{}", "─".repeat(50));

    if config_file.exists() {
        let contents =
            std::fs::read_to_string(&config_file).context("Failed to read config file")?;
        println!("{}", contents);
    } else {
        println!(
            "{} No config file at {}, showing defaults.",
            "Note:".yellow(),
            config_file.display()
        );
        println!();
        println!("{}", Config::default_config_string());
    }

    Ok(())
}

pub fn path(config_path: Option<&Path>) -> Result<()> {
    let ctx = AppContext::load(config_path)?;
    println!("Config:   {}", ctx.config_file.display());
    println!("Database: {}", ctx.paths.database_file.display());
    println!("Output:   {}", ctx.config.output_dir().display());
    Ok(())
}

pub fn set(config_path: Option<&Path>, key: &str, value: &str) -> Result<()> {
    let mut ctx = AppContext::load(config_path)?;

    ctx.config.set(key, value)?;
    ctx.config
        .save_to(&ctx.config_file)
        .context("Failed to save config")?;

    println!("{} Set {} = {}", "✓".green(), key.cyan(), value);

    Ok(())
}
