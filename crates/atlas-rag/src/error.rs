//! Error types for retrieval and question answering.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Database error: {0}")]
    Database(#[from] atlas_db::DbError),

    #[error("Model error: {0}")]
    Llm(#[from] atlas_llm::LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

pub type RagResult<T> = Result<T, RagError>;
