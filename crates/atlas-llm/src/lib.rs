//! Atlas LLM - embedding and chat-generation clients.
//!
//! Embeddings come from an Ollama-compatible server. Answers come from
//! Google Gemini or, for fully local runs, from Ollama itself.

mod client;
mod error;
mod gemini;
mod traits;
mod types;

pub use client::OllamaClient;
pub use error::{LlmError, LlmResult};
pub use gemini::GeminiClient;
pub use traits::{Embedder, Generator};
pub use types::*;

use atlas_config::{LlmConfig, LlmProvider};

/// Build the generator selected by `llm.provider`.
pub fn build_generator(config: &LlmConfig) -> LlmResult<Box<dyn Generator>> {
    match config.provider {
        LlmProvider::Gemini => Ok(Box::new(GeminiClient::from_config(config)?)),
        LlmProvider::Ollama => Ok(Box::new(OllamaClient::from_llm_config(config)?)),
    }
}
