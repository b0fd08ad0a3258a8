//! Vector search over stored document embeddings.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::operations::documents::document_from_row;
use atlas_core::Document;
use std::cmp::Ordering;
use tracing::debug;

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 {
        return 0.0;
    }

    dot_product / denominator
}

/// Serialize a vector as little-endian f32 bytes.
pub(crate) fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Deserialize a little-endian f32 blob, reading at most `dimensions` values.
pub(crate) fn decode_vector(bytes: &[u8], dimensions: usize) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .take(dimensions)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

impl Database {
    /// Return the `top_k` documents most similar to `query_vector`.
    ///
    /// Brute-force scan over every embedding. Documents whose vector has a
    /// different dimension than the query are skipped. Each returned
    /// document carries its similarity in `score`, highest first.
    pub fn vector_search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        min_score: Option<f32>,
    ) -> DbResult<Vec<Document>> {
        if top_k == 0 || query_vector.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        let min_score = min_score.unwrap_or(f32::MIN);

        let mut stmt = conn.prepare(
            r#"
            SELECT d.id, d.source, d.content, d.meta, d.created_at, e.vector, e.dimensions
            FROM embeddings e
            JOIN documents d ON d.id = e.document_id
            "#,
        )?;

        let rows = stmt.query_map([], document_from_row)?;

        let mut results: Vec<Document> = Vec::new();
        let mut mismatched = 0usize;

        for row in rows {
            let mut doc = row.map_err(DbError::from)?;
            let score = match doc.embedding.as_deref() {
                Some(vector) if vector.len() == query_vector.len() => {
                    cosine_similarity(query_vector, vector)
                }
                _ => {
                    mismatched += 1;
                    continue;
                }
            };

            if score >= min_score {
                doc.score = Some(score);
                results.push(doc);
            }
        }

        if mismatched > 0 {
            debug!("Skipped {} embeddings with mismatched dimensions", mismatched);
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
        });
        results.truncate(top_k);

        Ok(results)
    }

    /// Get embedding statistics: (embedded_count, total_count).
    pub fn embedding_stats(&self) -> DbResult<(usize, usize)> {
        let conn = self.conn()?;

        let total: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        let embedded: i64 =
            conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;

        Ok((embedded as usize, total as usize))
    }

    /// Embedding models recorded in the store.
    pub fn embedding_models(&self) -> DbResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT DISTINCT model FROM embeddings ORDER BY model")?;
        let models = stmt.query_map([], |row| row.get(0))?;
        models.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}
