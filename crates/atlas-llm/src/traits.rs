//! Provider-neutral interfaces for embedding and generation.

use crate::error::LlmResult;
use async_trait::async_trait;

/// Turns text into a dense vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> LlmResult<Vec<f32>>;

    /// Embed several texts, keeping their order.
    async fn embed_batch(&self, texts: &[String]) -> LlmResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Label stored alongside vectors and chat messages.
    fn model_name(&self) -> &str;
}

/// Produces a chat reply from a system prompt and a user message.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> LlmResult<String>;

    fn model_name(&self) -> &str;
}
