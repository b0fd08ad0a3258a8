//! Atlas Server - a thin HTTP API over the question-answering engine.

mod error;
pub mod routes;
mod server;

pub use error::{ServerError, ServerResult};
pub use server::{build_router, serve, AppState};
