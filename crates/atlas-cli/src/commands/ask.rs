//! Ask command - answer a single question.

use super::{print_response, runtime, AppContext};
use anyhow::{Context, Result};
use atlas_rag::QueryEngine;
use colored::Colorize;
use std::path::Path;

/// Documents listed under an answer.
const SOURCES_SHOWN: usize = 3;

pub fn run(config_path: Option<&Path>, question: &str, session: &str) -> Result<()> {
    let ctx = AppContext::load(config_path)?;
    let db = ctx.database()?;

    let (embedded, _) = db.embedding_stats()?;
    if embedded == 0 {
        anyhow::bail!("No documents indexed. Run 'atlas ingest' first.");
    }

    let engine = QueryEngine::from_config(&ctx.config, db).context("Failed to set up the query engine")?;

    println!("{} {}", "Question:".cyan().bold(), question);
    println!("{}", "─".repeat(70));
    println!();

    let rt = runtime()?;
    let response = rt
        .block_on(engine.query(session, question))
        .context("Failed to answer the question")?;

    print_response(&response, SOURCES_SHOWN);
    Ok(())
}
