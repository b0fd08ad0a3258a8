//! Atlas Core - Core types and domain models for the Atlas retrieval system.

mod error;
mod types;

pub use error::{Error, Result};
pub use types::*;
