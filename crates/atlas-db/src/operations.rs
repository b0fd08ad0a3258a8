//! Database operations.

pub mod documents;
pub mod history;
pub mod vectors;
