//! Retrieval commands: a single query, or a whole questions file.

use super::{preview, runtime, AppContext};
use anyhow::{Context, Result};
use atlas_llm::{Embedder, OllamaClient};
use atlas_rag::{batch_retrieve, Retriever};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

const PREVIEW_CHARS: usize = 500;

fn build_retriever(ctx: &AppContext) -> Result<Retriever> {
    let db = ctx.database()?;
    let embedder: Arc<dyn Embedder> = Arc::new(
        OllamaClient::from_embedding_config(&ctx.config.embedding)
            .context("Failed to create embedding client")?,
    );
    Ok(Retriever::from_config(
        db,
        embedder,
        &ctx.config.embedding,
        &ctx.config.retrieval,
    ))
}

pub fn run(config_path: Option<&Path>, query: &str, top_k: Option<usize>) -> Result<()> {
    let ctx = AppContext::load(config_path)?;
    let retriever = build_retriever(&ctx)?;

    let rt = runtime()?;
    let documents = rt
        .block_on(retriever.retrieve(query, top_k))
        .context("Retrieval failed")?;

    println!("{} {}", "Query:".cyan().bold(), query);
    println!("{}", "─".repeat(70));

    if documents.is_empty() {
        println!("{}", "No documents found.".yellow());
        return Ok(());
    }

    for (i, doc) in documents.iter().enumerate() {
        println!(
            "\n{} {} {}",
            format!("Document {}", i + 1).white().bold(),
            format!("(Score: {:.4})", doc.score.unwrap_or(0.0)).green(),
            doc.file_name().dimmed()
        );
        println!("{}", preview(&doc.content, PREVIEW_CHARS));
        println!("{} {}", "Meta:".dimmed(), doc.meta.to_string().dimmed());
    }

    Ok(())
}

pub fn run_batch(config_path: Option<&Path>, file: &Path, top_k: Option<usize>) -> Result<()> {
    let ctx = AppContext::load(config_path)?;
    let retriever = build_retriever(&ctx)?;

    let rt = runtime()?;
    let report = rt
        .block_on(batch_retrieve(&retriever, file, &ctx.config.output_dir(), top_k))
        .with_context(|| format!("Batch retrieval over {} failed", file.display()))?;

    println!(
        "{} {} queries",
        "Processed:".green().bold(),
        report.queries
    );
    if report.failed > 0 {
        println!("{} {} queries", "Failed:".red().bold(), report.failed);
    }
    println!("Results written to {}", report.output_path.display());

    Ok(())
}
