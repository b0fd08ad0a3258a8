//! Ingest command implementation.

use super::{runtime, AppContext};
use anyhow::{Context, Result};
use atlas_config::expand_path;
use atlas_core::SplitBy;
use atlas_ingest::{discover_files, dump_index, IngestEvent, Ingestor};
use atlas_llm::OllamaClient;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Overrides for the `[ingest]` section.
pub struct IngestArgs {
    pub dir: Option<String>,
    pub split_by: Option<String>,
    pub split_length: Option<usize>,
    pub split_overlap: Option<usize>,
    pub reset: bool,
    pub dump: bool,
}

pub fn run(config_path: Option<&Path>, args: IngestArgs) -> Result<()> {
    let mut ctx = AppContext::load(config_path)?;
    let db = ctx.database()?;

    let ingest = &mut ctx.config.ingest;
    if let Some(dir) = args.dir {
        ingest.pdf_dir = dir;
    }
    if let Some(split_by) = args.split_by {
        ingest.split_by = SplitBy::parse(&split_by)?;
    }
    if let Some(length) = args.split_length {
        ingest.split_length = length;
    }
    if let Some(overlap) = args.split_overlap {
        ingest.split_overlap = overlap;
    }
    ctx.config.validate()?;

    let config = &ctx.config;
    let pdf_dir = expand_path(&config.ingest.pdf_dir);
    let ingestor = Ingestor::new(db.clone(), &config.ingest, config.embedding.document_prefix.clone())?;
    let embedder = OllamaClient::from_embedding_config(&config.embedding)
        .context("Failed to create embedding client")?;

    let rt = runtime()?;
    if !rt.block_on(embedder.is_available()) {
        anyhow::bail!(
            "Embedding server is not running at {}. Start it with 'ollama serve'.",
            config.embedding.host
        );
    }

    if args.reset {
        let deleted = ingestor.reset()?;
        println!("{} {} documents", "Deleted:".yellow().bold(), deleted);
    }

    println!("{} {}", "Scanning:".cyan(), pdf_dir.display());
    let files = discover_files(&pdf_dir, &config.ingest.patterns, config.ingest.recursive)?;

    if files.is_empty() {
        println!("{}", "No matching files found.".yellow());
        return Ok(());
    }
    println!(
        "Found {} files (split by {}, length {}, overlap {})",
        files.len(),
        config.ingest.split_by,
        config.ingest.split_length,
        config.ingest.split_overlap
    );

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );

    let progress = pb.clone();
    let mut failures = Vec::new();
    let mut on_event = |event: IngestEvent| match event {
        IngestEvent::FileStarted(path) => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            progress.set_message(name);
        }
        IngestEvent::FileIndexed { .. } => progress.inc(1),
        IngestEvent::FileFailed { path, error } => {
            failures.push((path, error));
            progress.inc(1);
        }
    };

    let report = rt.block_on(ingestor.run(&files, &embedder, &mut on_event))?;
    pb.finish_and_clear();

    println!(
        "\n{} {} of {} files ({} chunks)",
        "Indexed:".green().bold(),
        report.files_indexed(),
        report.files_seen,
        report.chunks_written
    );
    if report.chunks_failed > 0 {
        println!(
            "{} {} chunks could not be embedded",
            "Skipped:".yellow().bold(),
            report.chunks_failed
        );
    }
    if !failures.is_empty() {
        println!("{} {} files", "Failed:".red().bold(), failures.len());
        for (path, error) in &failures {
            println!("  {} {}", path.display(), error.dimmed());
        }
    }
    println!(
        "Documents in store: {} → {} ({:.2?})",
        report.initial_count, report.final_count, report.elapsed
    );

    if args.dump {
        match dump_index(
            &db,
            &config.output_dir(),
            config.ingest.split_by,
            config.ingest.split_length,
        )? {
            Some(path) => println!("{} {}", "Dumped index:".cyan(), path.display()),
            None => println!("{}", "Nothing to dump.".yellow()),
        }
    }

    Ok(())
}
