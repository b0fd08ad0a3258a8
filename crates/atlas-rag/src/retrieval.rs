//! Query embedding and similarity search, plus the batch evaluation run.

use crate::error::{RagError, RagResult};
use atlas_config::{EmbeddingConfig, RetrievalConfig};
use atlas_core::Document;
use atlas_db::Database;
use atlas_llm::Embedder;
use chrono::Local;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const RULE: usize = 50;

/// Embeds queries and searches the vector store.
#[derive(Clone)]
pub struct Retriever {
    db: Database,
    embedder: Arc<dyn Embedder>,
    query_prefix: String,
    top_k: usize,
    min_score: f32,
}

impl Retriever {
    pub fn new(db: Database, embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self {
            db,
            embedder,
            query_prefix: String::new(),
            top_k,
            min_score: 0.0,
        }
    }

    pub fn from_config(
        db: Database,
        embedder: Arc<dyn Embedder>,
        embedding: &EmbeddingConfig,
        retrieval: &RetrievalConfig,
    ) -> Self {
        Self::new(db, embedder, retrieval.top_k)
            .with_query_prefix(embedding.query_prefix.clone())
            .with_min_score(retrieval.min_score)
    }

    pub fn with_query_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.query_prefix = prefix.into();
        self
    }

    /// Drop results scoring below `min_score`. Zero or less disables the cut.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Return the closest stored chunks to `text`, best first.
    pub async fn retrieve(&self, text: &str, top_k: Option<usize>) -> RagResult<Vec<Document>> {
        let top_k = top_k.unwrap_or(self.top_k);
        let query = format!("{}{}", self.query_prefix, text);
        let vector = self.embedder.embed(&query).await?;
        debug!("Embedded query into {} dimensions", vector.len());

        let db = self.db.clone();
        let min_score = (self.min_score > 0.0).then_some(self.min_score);
        let documents = tokio::task::spawn_blocking(move || db.vector_search(&vector, top_k, min_score))
            .await
            .map_err(|e| RagError::Task(e.to_string()))??;

        if documents.is_empty() {
            warn!("No documents retrieved for query");
        } else {
            debug!("Retrieved {} documents", documents.len());
        }

        Ok(documents)
    }
}

/// Outcome of a batch retrieval run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub queries: usize,
    pub failed: usize,
    pub output_path: PathBuf,
}

/// Read one question per non-empty line.
pub fn read_questions(path: &Path) -> RagResult<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

fn write_results(out: &mut String, documents: &[Document]) {
    for (i, doc) in documents.iter().enumerate() {
        let _ = write!(
            out,
            "\nDocument {} (Score: {:.4})\n{}\n{}\n{}\n",
            i + 1,
            doc.score.unwrap_or(0.0),
            doc.content,
            doc.meta,
            "-".repeat(RULE)
        );
    }
}

/// Run every question in `questions_path` through retrieval and write the
/// results to `{output_dir}/retrieval_results_{timestamp}.txt`.
///
/// A failing query is recorded in the output and the run continues.
pub async fn batch_retrieve(
    retriever: &Retriever,
    questions_path: &Path,
    output_dir: &Path,
    top_k: Option<usize>,
) -> RagResult<BatchReport> {
    let questions = read_questions(questions_path)?;
    info!("Running batch retrieval for {} queries", questions.len());

    let mut out = String::new();
    let mut failed = 0;

    for question in &questions {
        match retriever.retrieve(question, top_k).await {
            Ok(documents) => {
                let _ = writeln!(out, "Query: {}", question);
                write_results(&mut out, &documents);
                out.push('\n');
            }
            Err(e) => {
                warn!("Query failed: {}: {}", question, e);
                failed += 1;
                let _ = write!(
                    out,
                    "\nQuery failed: {}\nError: {}\n{}\n",
                    question,
                    e,
                    "-".repeat(RULE)
                );
            }
        }
    }

    std::fs::create_dir_all(output_dir)?;
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let output_path = output_dir.join(format!("retrieval_results_{}.txt", timestamp));
    std::fs::write(&output_path, out)?;

    info!(
        "Batch retrieval finished: {} queries, {} failed, results in {}",
        questions.len(),
        failed,
        output_path.display()
    );

    Ok(BatchReport {
        queries: questions.len(),
        failed,
        output_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use atlas_core::DuplicatePolicy;
    use atlas_llm::{LlmError, LlmResult};
    use std::sync::Mutex;

    /// Maps keywords onto fixed axes; fails on "boom".
    struct KeywordEmbedder {
        seen: Mutex<Vec<String>>,
    }

    impl KeywordEmbedder {
        fn new() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> LlmResult<Vec<f32>> {
            self.seen.lock().unwrap().push(text.to_string());
            if text.contains("boom") {
                return Err(LlmError::EmptyResponse);
            }
            let lower = text.to_lowercase();
            Ok(vec![
                if lower.contains("rome") { 1.0 } else { 0.0 },
                if lower.contains("egypt") { 1.0 } else { 0.0 },
                0.1,
            ])
        }

        fn model_name(&self) -> &str {
            "keyword"
        }
    }

    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        let docs = vec![
            Document::new("rome.pdf", "Rome had consuls.")
                .with_split(0)
                .with_embedding(vec![1.0, 0.0, 0.1]),
            Document::new("egypt.pdf", "Egypt had pharaohs.")
                .with_split(0)
                .with_embedding(vec![0.0, 1.0, 0.1]),
        ];
        db.write_documents(&docs, DuplicatePolicy::Overwrite, "keyword")
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_retrieve_ranks_by_similarity() {
        let embedder = Arc::new(KeywordEmbedder::new());
        let retriever = Retriever::new(seeded_db(), embedder.clone(), 5)
            .with_query_prefix("query: ");

        let docs = retriever.retrieve("Who ruled Rome?", None).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].source, "rome.pdf");
        assert!(docs[0].score.unwrap() > docs[1].score.unwrap());

        let docs = retriever.retrieve("Who ruled Egypt?", Some(1)).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, "egypt.pdf");

        assert_eq!(embedder.seen.lock().unwrap()[0], "query: Who ruled Rome?");
    }

    #[tokio::test]
    async fn test_min_score_filters() {
        let retriever = Retriever::new(seeded_db(), Arc::new(KeywordEmbedder::new()), 5)
            .with_min_score(0.5);
        let docs = retriever.retrieve("rome", None).await.unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn test_retrieve_empty_store() {
        let db = Database::open_in_memory().unwrap();
        let retriever = Retriever::new(db, Arc::new(KeywordEmbedder::new()), 5);
        assert!(retriever.retrieve("rome", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_retrieve() {
        let retriever = Retriever::new(seeded_db(), Arc::new(KeywordEmbedder::new()), 1);
        let dir = tempfile::tempdir().unwrap();
        let questions = dir.path().join("questions.txt");
        std::fs::write(&questions, "Tell me about Rome\n\n  boom  \nEgypt?\n").unwrap();

        let report = batch_retrieve(&retriever, &questions, &dir.path().join("out"), None)
            .await
            .unwrap();
        assert_eq!(report.queries, 3);
        assert_eq!(report.failed, 1);

        let name = report.output_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("retrieval_results_"));

        let contents = std::fs::read_to_string(&report.output_path).unwrap();
        assert!(contents.starts_with("Query: Tell me about Rome\n\nDocument 1 (Score: "));
        assert!(contents.contains("Rome had consuls."));
        assert!(contents.contains("\nQuery failed: boom\nError: "));
        assert!(contents.contains("Query: Egypt?"));
    }
}
