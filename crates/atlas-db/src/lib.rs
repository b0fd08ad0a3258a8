//! Atlas DB - SQLite document store and chat history for Atlas.

mod database;
mod error;
mod migrations;
mod operations;

pub use database::Database;
pub use error::{DbError, DbResult};
pub use operations::documents::DocumentFilter;
pub use operations::history::SessionSummary;
pub use operations::vectors::cosine_similarity;
