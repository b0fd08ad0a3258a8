//! Server error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Static directory not found: {0}")]
    StaticDirNotFound(String),
}

pub type ServerResult<T> = Result<T, ServerError>;
