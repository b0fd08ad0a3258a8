//! Document store operations.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::operations::vectors::{decode_vector, encode_vector};
use atlas_core::{Document, DuplicatePolicy};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

/// Criteria for listing stored documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    /// Substring the document source must contain.
    pub source: Option<String>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
}

impl DocumentFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Map a `documents` row joined with its optional embedding.
///
/// Column order: id, source, content, meta, created_at, vector, dimensions.
pub(crate) fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    let meta_str: String = row.get(3)?;
    let created_at_str: String = row.get(4)?;
    let vector_bytes: Option<Vec<u8>> = row.get(5)?;
    let dimensions: Option<i64> = row.get(6)?;

    Ok(Document {
        id: row.get(0)?,
        source: row.get(1)?,
        content: row.get(2)?,
        meta: serde_json::from_str(&meta_str).unwrap_or_else(|_| serde_json::json!({})),
        embedding: match (vector_bytes, dimensions) {
            (Some(bytes), Some(dims)) => Some(decode_vector(&bytes, dims as usize)),
            _ => None,
        },
        score: None,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

impl Database {
    /// Number of stored documents.
    pub fn count_documents(&self) -> DbResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Write documents and their embeddings in a single transaction.
    ///
    /// Returns the number of documents actually written. With
    /// [`DuplicatePolicy::Fail`] an existing ID rolls the whole batch back.
    pub fn write_documents(
        &self,
        documents: &[Document],
        policy: DuplicatePolicy,
        embedding_model: &str,
    ) -> DbResult<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut written = 0;

        {
            let mut exists_stmt = tx.prepare("SELECT 1 FROM documents WHERE id = ?1")?;
            let mut doc_stmt = tx.prepare(
                r#"
                INSERT INTO documents (id, source, split_id, content, meta, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO UPDATE SET
                    source = excluded.source,
                    split_id = excluded.split_id,
                    content = excluded.content,
                    meta = excluded.meta,
                    created_at = excluded.created_at
                "#,
            )?;
            let mut delete_embedding_stmt =
                tx.prepare("DELETE FROM embeddings WHERE document_id = ?1")?;
            let mut embedding_stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO embeddings (document_id, vector, model, dimensions)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )?;

            for doc in documents {
                let exists = exists_stmt
                    .query_row(params![doc.id], |_| Ok(()))
                    .optional()?
                    .is_some();

                if exists {
                    match policy {
                        DuplicatePolicy::Skip => {
                            debug!("Skipping existing document {}", doc.id);
                            continue;
                        }
                        DuplicatePolicy::Fail => return Err(DbError::Duplicate(doc.id.clone())),
                        DuplicatePolicy::Overwrite => {}
                    }
                }

                doc_stmt.execute(params![
                    doc.id,
                    doc.source,
                    doc.split_id().map(|s| s as i64),
                    doc.content,
                    doc.meta.to_string(),
                    doc.created_at.to_rfc3339(),
                ])?;

                match &doc.embedding {
                    Some(vector) => {
                        embedding_stmt.execute(params![
                            doc.id,
                            encode_vector(vector),
                            embedding_model,
                            vector.len() as i64,
                        ])?;
                    }
                    None => {
                        delete_embedding_stmt.execute(params![doc.id])?;
                    }
                }

                written += 1;
            }
        }

        tx.commit()?;
        debug!("Wrote {} of {} documents", written, documents.len());
        Ok(written)
    }

    /// List stored documents ordered by source and split position.
    pub fn filter_documents(&self, filter: &DocumentFilter) -> DbResult<Vec<Document>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT d.id, d.source, d.content, d.meta, d.created_at, e.vector, e.dimensions
            FROM documents d
            LEFT JOIN embeddings e ON e.document_id = d.id
            WHERE (?1 IS NULL OR instr(d.source, ?1) > 0)
            ORDER BY d.source, d.split_id
            LIMIT ?2
            "#,
        )?;

        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
        let docs = stmt.query_map(params![filter.source, limit], document_from_row)?;

        docs.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Get a single document by ID.
    pub fn get_document(&self, id: &str) -> DbResult<Document> {
        let conn = self.conn()?;
        conn.query_row(
            r#"
            SELECT d.id, d.source, d.content, d.meta, d.created_at, e.vector, e.dimensions
            FROM documents d
            LEFT JOIN embeddings e ON e.document_id = d.id
            WHERE d.id = ?1
            "#,
            params![id],
            document_from_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                DbError::NotFound(format!("Document not found: {}", id))
            }
            _ => DbError::from(e),
        })
    }

    /// Delete every stored document and embedding.
    pub fn delete_all_documents(&self) -> DbResult<usize> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM embeddings", [])?;
        let count = conn.execute("DELETE FROM documents", [])?;
        Ok(count)
    }

    /// Delete the documents that came from one source file.
    pub fn delete_documents_by_source(&self, source: &str) -> DbResult<usize> {
        let conn = self.conn()?;
        let count = conn.execute("DELETE FROM documents WHERE source = ?1", params![source])?;
        Ok(count)
    }

    /// Distinct sources with their chunk counts.
    pub fn list_sources(&self) -> DbResult<Vec<(String, usize)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT source, COUNT(*) FROM documents GROUP BY source ORDER BY source",
        )?;
        let rows = stmt.query_map([], |row| {
            let source: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((source, count as usize))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}
