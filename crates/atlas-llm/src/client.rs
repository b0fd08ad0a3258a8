//! Ollama HTTP client.

use crate::error::{LlmError, LlmResult};
use crate::traits::{Embedder, Generator};
use crate::types::*;
use async_trait::async_trait;
use atlas_config::{EmbeddingConfig, LlmConfig};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Client for an Ollama-compatible server.
///
/// The same client type serves embeddings (`model` is the embedding model)
/// and local generation (`model` is the chat model).
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    host: String,
    model: String,
    options: GenerateOptions,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a new client.
    pub fn new(
        host: impl Into<String>,
        model: impl Into<String>,
        timeout_seconds: u64,
    ) -> LlmResult<Self> {
        let host = host.into();
        let timeout = Duration::from_secs(timeout_seconds);

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            model: model.into(),
            options: GenerateOptions::default(),
            timeout,
        })
    }

    /// Client for the embedding server.
    pub fn from_embedding_config(config: &EmbeddingConfig) -> LlmResult<Self> {
        Self::new(&config.host, &config.model, config.timeout_seconds)
    }

    /// Client for local generation.
    pub fn from_llm_config(config: &LlmConfig) -> LlmResult<Self> {
        let mut client = Self::new(&config.ollama_host, &config.model, config.timeout_seconds)?;
        client.options = GenerateOptions::new()
            .with_temperature(config.temperature)
            .with_num_predict(config.max_output_tokens as i32);
        Ok(client)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn send_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_connect() {
            LlmError::ServerNotRunning {
                host: self.host.clone(),
            }
        } else if e.is_timeout() {
            LlmError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            LlmError::Http(e)
        }
    }

    async fn check_status(
        &self,
        response: reqwest::Response,
        model: &str,
    ) -> LlmResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        if text.contains("not found") || status.as_u16() == 404 {
            return Err(LlmError::ModelNotFound {
                model: model.to_string(),
            });
        }

        Err(LlmError::ApiError {
            status: status.as_u16(),
            message: text,
        })
    }

    /// Check if the server is available.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.host);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// List all available models.
    pub async fn list_models(&self) -> LlmResult<Vec<ModelInfo>> {
        let url = format!("{}/api/tags", self.host);
        debug!("Listing models from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status,
                message: text,
            });
        }

        let list: ListModelsResponse = response.json().await?;
        Ok(list.models)
    }

    /// Check if the configured model is available.
    pub async fn has_model(&self) -> LlmResult<bool> {
        let models = self.list_models().await?;
        Ok(model_listed(&models, &self.model))
    }

    /// Generate an embedding with an explicit model.
    pub async fn embed_with(&self, model: &str, text: &str) -> LlmResult<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.host);
        debug!(
            "Generating embedding with model {} for text length {}",
            model,
            text.len()
        );

        let request = EmbeddingRequest {
            model: model.to_string(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = self.check_status(response, model).await?;

        let embedding_response: EmbeddingResponse = response.json().await?;
        if embedding_response.embedding.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        debug!(
            "Generated embedding with {} dimensions",
            embedding_response.embedding.len()
        );

        Ok(embedding_response.embedding)
    }

    /// Generate text (non-streaming).
    pub async fn generate_request(&self, request: GenerateRequest) -> LlmResult<GenerateResponse> {
        let url = format!("{}/api/generate", self.host);
        debug!("Generating with model {}", request.model);

        let mut request = request;
        request.stream = false;

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = self.check_status(response, &request.model).await?;

        let generate_response: GenerateResponse = response.json().await?;
        Ok(generate_response)
    }
}

/// Match a model name with or without its `:tag`.
fn model_listed(models: &[ModelInfo], model: &str) -> bool {
    models
        .iter()
        .any(|m| m.name == model || m.name.starts_with(&format!("{}:", model)))
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> LlmResult<Vec<f32>> {
        self.embed_with(&self.model, text).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate(&self, system: &str, user: &str) -> LlmResult<String> {
        let request = GenerateRequest::new(&self.model, user)
            .with_system(system)
            .with_options(self.options.clone());

        let response = self.generate_request(request).await?;
        if response.response.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(response.response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
