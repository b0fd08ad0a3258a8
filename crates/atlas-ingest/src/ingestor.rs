//! Main ingestion logic.

use crate::cleaner::DocumentCleaner;
use crate::error::IngestResult;
use crate::parsers;
use crate::report::IngestReport;
use crate::splitter::DocumentSplitter;
use atlas_config::IngestConfig;
use atlas_core::{Document, DuplicatePolicy};
use atlas_db::Database;
use atlas_llm::Embedder;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Progress notifications emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum IngestEvent {
    FileStarted(PathBuf),
    FileIndexed {
        path: PathBuf,
        chunks_written: usize,
        chunks_failed: usize,
    },
    FileFailed {
        path: PathBuf,
        error: String,
    },
}

/// Chunks written and lost for one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileOutcome {
    pub chunks_written: usize,
    pub chunks_failed: usize,
}

/// Converts, cleans, splits, embeds and stores source files.
pub struct Ingestor {
    db: Database,
    cleaner: DocumentCleaner,
    splitter: DocumentSplitter,
    policy: DuplicatePolicy,
    document_prefix: String,
}

impl Ingestor {
    /// Create a new ingestor. Fails on an invalid splitter or cleaner setting.
    pub fn new(
        db: Database,
        config: &IngestConfig,
        document_prefix: impl Into<String>,
    ) -> IngestResult<Self> {
        Ok(Self {
            db,
            cleaner: DocumentCleaner::from_config(config)?,
            splitter: DocumentSplitter::from_config(config)?,
            policy: config.duplicate_policy,
            document_prefix: document_prefix.into(),
        })
    }

    /// Create an ingestor with default pipeline settings.
    pub fn with_defaults(db: Database) -> IngestResult<Self> {
        Self::new(db, &IngestConfig::default(), "")
    }

    pub fn splitter(&self) -> &DocumentSplitter {
        &self.splitter
    }

    /// Delete every stored document.
    pub fn reset(&self) -> IngestResult<usize> {
        let deleted = self.db.delete_all_documents()?;
        self.db.vacuum()?;
        info!("Deleted {} documents from the store", deleted);
        Ok(deleted)
    }

    /// Convert, clean and split one file into unembedded chunks.
    pub fn prepare_file(&self, path: &Path) -> IngestResult<Vec<Document>> {
        let parsed = parsers::parse_file(path)?;
        let mut source = parsed.into_document(path);
        source.content = self.cleaner.clean(&source.content);

        let chunks = self.splitter.split(&source);
        debug!("Split {:?} into {} chunks", path, chunks.len());
        Ok(chunks)
    }

    /// Embed chunks one by one. Chunks whose embedding fails are dropped.
    pub async fn embed_chunks(
        &self,
        embedder: &dyn Embedder,
        chunks: Vec<Document>,
    ) -> (Vec<Document>, usize) {
        let mut embedded = Vec::with_capacity(chunks.len());
        let mut failed = 0;

        for chunk in chunks {
            let text = format!("{}{}", self.document_prefix, chunk.content);
            match embedder.embed(&text).await {
                Ok(vector) => embedded.push(chunk.with_embedding(vector)),
                Err(e) => {
                    warn!(
                        "Failed to embed chunk {} of {}: {}",
                        chunk.split_id().unwrap_or_default(),
                        chunk.source,
                        e
                    );
                    failed += 1;
                }
            }
        }

        (embedded, failed)
    }

    /// Ingest a single file.
    pub async fn ingest_file(&self, path: &Path, embedder: &dyn Embedder) -> IngestResult<FileOutcome> {
        info!("Ingesting file: {}", path.display());

        let chunks = self.prepare_file(path)?;
        let (embedded, chunks_failed) = self.embed_chunks(embedder, chunks).await;
        let chunks_written = self
            .db
            .write_documents(&embedded, self.policy, embedder.model_name())?;

        info!(
            "Successfully ingested: {} ({} chunks)",
            path.display(),
            chunks_written
        );

        Ok(FileOutcome {
            chunks_written,
            chunks_failed,
        })
    }

    /// Ingest every file in `files`. A failing file is logged and counted
    /// while the rest of the batch continues.
    pub async fn run(
        &self,
        files: &[PathBuf],
        embedder: &dyn Embedder,
        on_event: &mut (dyn FnMut(IngestEvent) + Send),
    ) -> IngestResult<IngestReport> {
        let started = Instant::now();
        let mut report = IngestReport {
            files_seen: files.len(),
            initial_count: self.db.count_documents()?,
            ..Default::default()
        };

        for path in files {
            on_event(IngestEvent::FileStarted(path.clone()));

            match self.ingest_file(path, embedder).await {
                Ok(outcome) => {
                    report.chunks_written += outcome.chunks_written;
                    report.chunks_failed += outcome.chunks_failed;
                    on_event(IngestEvent::FileIndexed {
                        path: path.clone(),
                        chunks_written: outcome.chunks_written,
                        chunks_failed: outcome.chunks_failed,
                    });
                }
                Err(e) => {
                    warn!("Failed to ingest {:?}: {}", path, e);
                    report.files_failed += 1;
                    on_event(IngestEvent::FileFailed {
                        path: path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report.final_count = self.db.count_documents()?;
        report.elapsed = started.elapsed();

        info!(
            "Indexed {} of {} files: {} chunks written, {} failed ({} -> {} documents) in {:.2?}",
            report.files_indexed(),
            report.files_seen,
            report.chunks_written,
            report.chunks_failed,
            report.initial_count,
            report.final_count,
            report.elapsed
        );

        Ok(report)
    }
}
