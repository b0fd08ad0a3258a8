//! Error types for Atlas.

use thiserror::Error;

/// Core error type for Atlas operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown value for {field}: {value}")]
    UnknownVariant { field: &'static str, value: String },
}

/// Result type alias using Atlas's Error.
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
