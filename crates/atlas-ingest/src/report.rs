//! Ingestion summary and index dump.

use crate::error::IngestResult;
use atlas_core::{Document, SplitBy};
use atlas_db::{Database, DocumentFilter};
use chrono::Local;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub files_seen: usize,
    pub files_failed: usize,
    pub chunks_written: usize,
    pub chunks_failed: usize,
    pub initial_count: usize,
    pub final_count: usize,
    pub elapsed: Duration,
}

impl IngestReport {
    pub fn files_indexed(&self) -> usize {
        self.files_seen - self.files_failed
    }
}

/// Render stored documents in the dump layout.
pub fn format_dump(documents: &[Document]) -> String {
    let mut out = String::new();
    for (i, doc) in documents.iter().enumerate() {
        let _ = writeln!(out, "\nDocument {} (ID: {}):", i + 1, doc.id);
        out.push_str("Content:\n");
        out.push_str(&doc.content);
        out.push('\n');
        out.push_str("Metadata:\n");
        out.push_str(&doc.meta.to_string());
        out.push('\n');
        out.push_str(&"-".repeat(50));
        out.push('\n');
    }
    out
}

/// Write every stored document to
/// `{output_dir}/test_run_{split_by}_{split_length}_{timestamp}.txt`.
pub fn dump_index(
    db: &Database,
    output_dir: &Path,
    split_by: SplitBy,
    split_length: usize,
) -> IngestResult<Option<PathBuf>> {
    let documents = db.filter_documents(&DocumentFilter::all())?;
    if documents.is_empty() {
        info!("No documents in the store, skipping index dump");
        return Ok(None);
    }

    std::fs::create_dir_all(output_dir)?;
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let path = output_dir.join(format!(
        "test_run_{}_{}_{}.txt",
        split_by, split_length, timestamp
    ));

    std::fs::write(&path, format_dump(&documents))?;
    info!(
        "Indexed document details for {} documents written to {}",
        documents.len(),
        path.display()
    );

    Ok(Some(path))
}
