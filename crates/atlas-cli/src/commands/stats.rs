//! Stats command - show database statistics.

use super::{format_size, AppContext};
use anyhow::Result;
use atlas_db::Database;
use colored::Colorize;
use std::path::Path;

pub fn run(config_path: Option<&Path>) -> Result<()> {
    let ctx = AppContext::load(config_path)?;
    let db = ctx.database()?;

    let documents = db.count_documents()?;
    let (embedded, _) = db.embedding_stats()?;
    let models = db.embedding_models()?;
    let sources = db.list_sources()?;
    let sessions = db.list_sessions()?;
    let messages = db.count_messages()?;

    println!("{}", "Atlas Statistics".cyan().bold());
    println!("{}", "─".repeat(50));

    println!();
    println!("{}", "Document Store".white().bold());
    println!("  Chunks: {}", documents.to_string().green());
    println!("  Embedded: {}", embedded);
    if !models.is_empty() {
        println!("  Embedding models: {}", models.join(", "));
    }
    println!("  Source files: {}", sources.len());
    for (source, count) in &sources {
        println!("    📄 {}: {}", source, count);
    }

    println!();
    println!("{}", "Chat History".white().bold());
    println!("  Sessions: {}", sessions.len());
    println!("  Messages: {}", messages);

    println!();
    println!("{}", "Storage".white().bold());
    let size = Database::file_size(&ctx.paths.database_file)?;
    println!("  Database size: {}", format_size(size));
    println!("  Database file: {}", ctx.paths.database_file.display());

    Ok(())
}
