//! Initialize Atlas.

use super::AppContext;
use anyhow::{Context, Result};
use atlas_config::Config;
use atlas_db::Database;
use colored::Colorize;
use std::path::Path;

pub fn run(config_path: Option<&Path>) -> Result<()> {
    let config_file = super::config_file(config_path)?;

    if !config_file.exists() {
        Config::create_default_file(&config_file).context("Failed to create config file")?;
        println!("  {} Created config: {}", "✓".green(), config_file.display());
    } else {
        println!(
            "{} Using existing config: {}",
            "Note:".yellow().bold(),
            config_file.display()
        );
    }

    let ctx = AppContext::load(config_path)?;

    if ctx.paths.database_file.exists() {
        println!(
            "{} Atlas is already initialized.",
            "Note:".yellow().bold()
        );
        println!("  Database: {}", ctx.paths.database_file.display());
        return Ok(());
    }

    println!("{}", "Initializing Atlas...".cyan().bold());

    ctx.paths
        .ensure_dirs()
        .context("Failed to create directories")?;
    println!("  {} Created directories", "✓".green());

    let _db = Database::open(&ctx.paths.database_file).context("Failed to initialize database")?;
    println!(
        "  {} Created database: {}",
        "✓".green(),
        ctx.paths.database_file.display()
    );

    println!();
    println!("{}", "Atlas initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!(
        "  1. Export your API key: {}",
        format!("export {}=...", ctx.config.llm.api_key_env).cyan()
    );
    println!(
        "  2. Put PDFs in {} and run {}",
        ctx.config.ingest.pdf_dir,
        "atlas ingest".cyan()
    );
    println!("  3. Ask a question: {}", "atlas ask \"Who ruled Carthage?\"".cyan());

    Ok(())
}
