//! CLI command implementations.

pub mod ask;
pub mod chat;
pub mod config;
pub mod history;
pub mod ingest;
pub mod init;
pub mod retrieve;
pub mod serve;
pub mod stats;

use anyhow::{Context, Result};
use atlas_config::{AppPaths, Config};
use atlas_core::RetrievedDocument;
use atlas_db::Database;
use atlas_rag::QueryResponse;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

/// Configuration plus the paths derived from it.
pub struct AppContext {
    pub config: Config,
    pub config_file: PathBuf,
    pub paths: AppPaths,
}

impl AppContext {
    /// Load the config from `config_path` or the platform default location.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config_file = config_file(config_path)?;
        let config = Config::load_from(&config_file)
            .with_context(|| format!("Failed to load config from {}", config_file.display()))?;
        let paths = config.paths().context("Failed to determine application directories")?;

        Ok(Self {
            config,
            config_file,
            paths,
        })
    }

    /// Open the database, ensuring atlas is initialized.
    pub fn database(&self) -> Result<Database> {
        if !self.paths.database_file.exists() {
            anyhow::bail!("Atlas is not initialized. Run 'atlas init' first.");
        }

        Database::open(&self.paths.database_file).context("Failed to open database")
    }
}

/// Resolve the config file location.
pub fn config_file(config_path: Option<&Path>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(AppPaths::new()
            .context("Failed to determine application directories")?
            .config_file),
    }
}

/// Create the async runtime commands block on.
pub fn runtime() -> Result<Runtime> {
    Runtime::new().context("Failed to create async runtime")
}

/// Format a file size in human-readable form.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Cut `text` to `max` characters for terminal previews.
pub fn preview(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    }
}

fn print_entities(label: &str, entities: &[atlas_core::Entity]) {
    if entities.is_empty() {
        return;
    }
    println!("{}", label.cyan().bold());
    for entity in entities {
        if entity.description.is_empty() {
            println!("  • {}", entity.name.white().bold());
        } else {
            println!("  • {}: {}", entity.name.white().bold(), entity.description);
        }
    }
}

fn print_sources(documents: &[RetrievedDocument], limit: usize) {
    if documents.is_empty() {
        return;
    }
    println!("{}", "─".repeat(70));
    println!("{}", "Sources:".cyan().bold());
    for (i, doc) in documents.iter().take(limit).enumerate() {
        let location = match doc.page {
            Some(page) => format!("{}, page {}", doc.source, page),
            None => doc.source.clone(),
        };
        println!(
            "  {}. {} (score: {:.3})",
            i + 1,
            location.white(),
            doc.score
        );
        println!("     {}", doc.content_snippet.dimmed());
    }
}

/// Print an answer with its entities and the top `sources` documents.
pub fn print_response(response: &QueryResponse, sources: usize) {
    println!("{}", "Answer:".green().bold());
    println!();
    println!("{}", response.answer);
    println!();

    let data = &response.structured_data;
    print_entities("Locations:", &data.locations);
    print_entities("Time Periods:", &data.time_periods);
    print_entities("Rulers or Polities:", &data.rulers);
    if !data.is_empty() {
        println!();
    }

    print_sources(&response.retrieved_documents, sources);
}
