//! Configuration structures and loading.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::{expand_path, AppPaths};
use atlas_core::{DuplicatePolicy, PromptStyle, SplitBy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub rag: RagConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> ConfigResult<Self> {
        let paths = AppPaths::new().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(&paths.config_file)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Create a default config file with comments.
    pub fn create_default_file(path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, Self::default_config_string())?;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.ingest.split_length == 0 {
            return Err(ConfigError::Invalid(
                "ingest.split_length must be at least 1".to_string(),
            ));
        }
        if self.ingest.split_overlap >= self.ingest.split_length {
            return Err(ConfigError::Invalid(format!(
                "ingest.split_overlap ({}) must be smaller than ingest.split_length ({})",
                self.ingest.split_overlap, self.ingest.split_length
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }
        if self.rag.min_query_chars > self.rag.max_query_chars {
            return Err(ConfigError::Invalid(
                "rag.min_query_chars is larger than rag.max_query_chars".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the application paths, honoring `general.data_dir`.
    pub fn paths(&self) -> ConfigResult<AppPaths> {
        let paths = AppPaths::new().ok_or(ConfigError::NoConfigDir)?;
        Ok(match &self.general.data_dir {
            Some(dir) => paths.with_data_dir(expand_path(dir)),
            None => paths,
        })
    }

    /// Directory for reports written by ingestion and batch retrieval.
    pub fn output_dir(&self) -> PathBuf {
        expand_path(&self.general.output_dir)
    }

    /// Apply a `section.key = value` override.
    pub fn set(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let invalid = |what: &str| ConfigError::Invalid(format!("{} for {}: {}", what, key, value));
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["general", "data_dir"] => self.general.data_dir = Some(value.to_string()),
            ["general", "output_dir"] => self.general.output_dir = value.to_string(),
            ["embedding", "host"] => self.embedding.host = value.to_string(),
            ["embedding", "model"] => self.embedding.model = value.to_string(),
            ["embedding", "query_prefix"] => self.embedding.query_prefix = value.to_string(),
            ["embedding", "document_prefix"] => self.embedding.document_prefix = value.to_string(),
            ["llm", "provider"] => {
                self.llm.provider = LlmProvider::parse(value).ok_or_else(|| invalid("Unknown provider"))?
            }
            ["llm", "model"] => self.llm.model = value.to_string(),
            ["llm", "base_url"] => self.llm.base_url = value.to_string(),
            ["llm", "api_key_env"] => self.llm.api_key_env = value.to_string(),
            ["llm", "temperature"] => {
                self.llm.temperature = value.parse().map_err(|_| invalid("Invalid number"))?
            }
            ["ingest", "pdf_dir"] => self.ingest.pdf_dir = value.to_string(),
            ["ingest", "split_by"] => {
                self.ingest.split_by = SplitBy::parse(value).map_err(|_| invalid("Unknown split unit"))?
            }
            ["ingest", "split_length"] => {
                self.ingest.split_length = value.parse().map_err(|_| invalid("Invalid number"))?
            }
            ["ingest", "split_overlap"] => {
                self.ingest.split_overlap = value.parse().map_err(|_| invalid("Invalid number"))?
            }
            ["retrieval", "top_k"] => {
                self.retrieval.top_k = value.parse().map_err(|_| invalid("Invalid number"))?
            }
            ["retrieval", "min_score"] => {
                self.retrieval.min_score = value.parse().map_err(|_| invalid("Invalid number"))?
            }
            ["rag", "prompt_style"] => {
                self.rag.prompt_style = PromptStyle::parse(value).map_err(|_| invalid("Unknown style"))?
            }
            ["chat", "max_history_turns"] => {
                self.chat.max_history_turns = value.parse().map_err(|_| invalid("Invalid number"))?
            }
            ["chat", "retrieval_history_turns"] => {
                self.chat.retrieval_history_turns =
                    value.parse().map_err(|_| invalid("Invalid number"))?
            }
            ["server", "host"] => self.server.host = value.to_string(),
            ["server", "port"] => {
                self.server.port = value.parse().map_err(|_| invalid("Invalid port"))?
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }

        self.validate()
    }

    /// Generate a default config file with helpful comments.
    pub fn default_config_string() -> String {
        r#"# Atlas Configuration
# Retrieval-augmented answers over your PDF collection

[general]
# Data directory for the database and REPL history
# data_dir = "~/.local/share/atlas"

# Where ingestion dumps and batch retrieval results are written
output_dir = "./data/output"

[embedding]
# Ollama-compatible embedding server
host = "http://localhost:11434"

# Sentence embedding model (all-MiniLM-L6-v2)
model = "all-minilm"

# e5 models expect "query: " and "passage: " here
query_prefix = ""
document_prefix = ""

timeout_seconds = 120

[llm]
# gemini or ollama
provider = "gemini"
model = "gemini-1.5-flash"
base_url = "https://generativelanguage.googleapis.com"

# Environment variable holding the API key
api_key_env = "GOOGLE_API_KEY"

# Used when provider = "ollama"
ollama_host = "http://localhost:11434"

temperature = 0.3
max_output_tokens = 1024
timeout_seconds = 120

[ingest]
pdf_dir = "./data/pdfs"
patterns = ["*.pdf"]
recursive = false

# Options: sentence, paragraph, word, page
split_by = "sentence"
split_length = 10
split_overlap = 0

remove_empty_lines = true
remove_extra_whitespaces = true
# remove_regex = "Page \\d+ of \\d+"

# overwrite, skip or fail
duplicate_policy = "overwrite"

[retrieval]
top_k = 10
min_score = 0.0

[rag]
# json: "Answer: ... / Structured JSON: {...}"
# sections: labelled Locations / Time Periods / Rulers or Polities lists
prompt_style = "json"
max_chunk_chars = 1000
max_context_chars = 8000
min_query_chars = 1
max_query_chars = 1000

[chat]
# Turns of history shown to the model
max_history_turns = 5
# Previous user questions folded into the retrieval query
retrieval_history_turns = 2

[server]
host = "127.0.0.1"
port = 8000
min_query_chars = 5
max_query_chars = 150
# static_dir = "./frontend_static"
"#
        .to_string()
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub data_dir: Option<String>,
    pub output_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            output_dir: "./data/output".to_string(),
        }
    }
}

/// Embedding server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub host: String,
    pub model: String,
    pub query_prefix: String,
    pub document_prefix: String,
    pub timeout_seconds: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model: "all-minilm".to_string(),
            query_prefix: String::new(),
            document_prefix: String::new(),
            timeout_seconds: 120,
        }
    }
}

/// Which backend answers generation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
    Ollama,
}

impl LlmProvider {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(LlmProvider::Gemini),
            "ollama" => Some(LlmProvider::Ollama),
            _ => None,
        }
    }
}

/// Chat generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub base_url: String,
    pub api_key_env: String,
    pub ollama_host: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            ollama_host: "http://localhost:11434".to_string(),
            temperature: 0.3,
            max_output_tokens: 1024,
            timeout_seconds: 120,
        }
    }
}

/// Ingestion pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub pdf_dir: String,
    pub patterns: Vec<String>,
    pub recursive: bool,
    pub split_by: SplitBy,
    pub split_length: usize,
    pub split_overlap: usize,
    pub remove_empty_lines: bool,
    pub remove_extra_whitespaces: bool,
    pub remove_regex: Option<String>,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            pdf_dir: "./data/pdfs".to_string(),
            patterns: vec!["*.pdf".to_string()],
            recursive: false,
            split_by: SplitBy::Sentence,
            split_length: 10,
            split_overlap: 0,
            remove_empty_lines: true,
            remove_extra_whitespaces: true,
            remove_regex: None,
            duplicate_policy: DuplicatePolicy::Overwrite,
        }
    }
}

/// Similarity search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub min_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            min_score: 0.0,
        }
    }
}

/// Prompt and context assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub prompt_style: PromptStyle,
    pub max_chunk_chars: usize,
    pub max_context_chars: usize,
    pub min_query_chars: usize,
    pub max_query_chars: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            prompt_style: PromptStyle::Json,
            max_chunk_chars: 1000,
            max_context_chars: 8000,
            min_query_chars: 1,
            max_query_chars: 1000,
        }
    }
}

/// Chat history windowing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub max_history_turns: usize,
    pub retrieval_history_turns: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_history_turns: 5,
            retrieval_history_turns: 2,
        }
    }
}

/// HTTP API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub min_query_chars: usize,
    pub max_query_chars: usize,
    pub static_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            min_query_chars: 5,
            max_query_chars: 150,
            static_dir: None,
        }
    }
}
