//! Core domain types for Atlas.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Unique identifier for stored documents (chunks).
pub type DocumentId = String;

/// Key under which chat history is kept.
pub type SessionId = String;

/// Session used when the caller does not name one.
pub const DEFAULT_SESSION: &str = "default";

/// Length of the content excerpt returned with retrieved documents.
pub const SNIPPET_CHARS: usize = 200;

/// Deterministic document ID from its source, split position and content.
pub fn content_id(source: &str, split_id: Option<usize>, content: &str) -> DocumentId {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    if let Some(split) = split_id {
        hasher.update(split.to_le_bytes());
    }
    hasher.update([0u8]);
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

/// How the splitter cuts text into units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SplitBy {
    #[default]
    Sentence,
    Paragraph,
    Word,
    Page,
}

impl SplitBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitBy::Sentence => "sentence",
            SplitBy::Paragraph => "paragraph",
            SplitBy::Word => "word",
            SplitBy::Page => "page",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sentence" => Ok(SplitBy::Sentence),
            "paragraph" => Ok(SplitBy::Paragraph),
            "word" => Ok(SplitBy::Word),
            "page" => Ok(SplitBy::Page),
            other => Err(Error::UnknownVariant {
                field: "split_by",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for SplitBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What to do when a written document's ID already exists in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    #[default]
    Overwrite,
    Skip,
    Fail,
}

/// Output shape the model is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// `Answer:` text followed by a `Structured JSON:` object.
    #[default]
    Json,
    /// `Answer:` text followed by labelled bullet sections.
    Sections,
}

impl PromptStyle {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(PromptStyle::Json),
            "sections" => Ok(PromptStyle::Sections),
            other => Err(Error::UnknownVariant {
                field: "prompt_style",
                value: other.to_string(),
            }),
        }
    }
}

/// A stored document: one chunk of a source file plus its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub content: String,
    pub source: String,
    pub meta: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        let source = source.into();
        let content = content.into();
        Self {
            id: content_id(&source, None, &content),
            content,
            source,
            meta: serde_json::json!({}),
            embedding: None,
            score: None,
            created_at: Utc::now(),
        }
    }

    /// Mark this document as split number `split_id` of its source.
    /// The ID is recomputed so every chunk of a file gets a distinct key.
    pub fn with_split(mut self, split_id: usize) -> Self {
        self.set_meta("split_id", serde_json::json!(split_id));
        self.id = content_id(&self.source, Some(split_id), &self.content);
        self
    }

    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Insert a single metadata key, turning `meta` into an object if needed.
    pub fn set_meta(&mut self, key: &str, value: serde_json::Value) {
        if !self.meta.is_object() {
            self.meta = serde_json::json!({});
        }
        if let Some(map) = self.meta.as_object_mut() {
            map.insert(key.to_string(), value);
        }
    }

    pub fn split_id(&self) -> Option<usize> {
        self.meta
            .get("split_id")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
    }

    pub fn page_number(&self) -> Option<u32> {
        self.meta
            .get("page_number")
            .and_then(|v| v.as_u64())
            .map(|v| v as u32)
    }

    /// File name of the source, falling back to the full source string.
    pub fn file_name(&self) -> String {
        self.meta
            .get("file_name")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| {
                std::path::Path::new(&self.source)
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(&self.source)
                    .to_string()
            })
    }
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of the per-session chat log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Row ID, assigned by the store on append.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub session: SessionId,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_documents: Option<serde_json::Value>,
    /// Label of the embedding model active when the message was written.
    pub embedding: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(session: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: None,
            session: session.into(),
            role,
            content: content.into(),
            structured_data: None,
            retrieved_documents: None,
            embedding: String::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(session: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(session, Role::User, content)
    }

    pub fn assistant(session: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(session, Role::Assistant, content)
    }

    pub fn with_embedding_label(mut self, label: impl Into<String>) -> Self {
        self.embedding = label.into();
        self
    }

    pub fn with_structured_data(mut self, data: serde_json::Value) -> Self {
        self.structured_data = Some(data);
        self
    }

    pub fn with_retrieved_documents(mut self, docs: serde_json::Value) -> Self {
        self.retrieved_documents = Some(docs);
        self
    }
}

/// A named entity extracted from a model reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Entity {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Typed entities parsed out of a model reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StructuredData {
    #[serde(default)]
    pub locations: Vec<Entity>,
    #[serde(default)]
    pub time_periods: Vec<Entity>,
    #[serde(default)]
    pub rulers: Vec<Entity>,
}

impl StructuredData {
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty() && self.time_periods.is_empty() && self.rulers.is_empty()
    }

    /// Locations in the `{location_name, description}` shape the map frontend reads.
    pub fn legacy_locations(&self) -> Vec<serde_json::Value> {
        self.locations
            .iter()
            .map(|l| {
                serde_json::json!({
                    "location_name": l.name,
                    "description": l.description,
                })
            })
            .collect()
    }
}

/// Retrieved chunk summary returned to callers and kept in history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub id: DocumentId,
    pub score: f32,
    pub content_snippet: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl From<&Document> for RetrievedDocument {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            score: doc.score.unwrap_or(0.0),
            content_snippet: snippet(&doc.content, SNIPPET_CHARS),
            source: doc.file_name(),
            page: doc.page_number(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_is_deterministic() {
        let a = content_id("a.pdf", Some(0), "Rome was founded.");
        let b = content_id("a.pdf", Some(0), "Rome was founded.");
        let c = content_id("a.pdf", Some(1), "Rome was founded.");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_with_split_sets_meta_and_id() {
        let doc = Document::new("/data/pdfs/rome.pdf", "text").with_split(3);
        assert_eq!(doc.split_id(), Some(3));
        assert_eq!(doc.id, content_id("/data/pdfs/rome.pdf", Some(3), "text"));
        assert_eq!(doc.file_name(), "rome.pdf");
    }

    #[test]
    fn test_snippet() {
        assert_eq!(snippet("short", 10), "short");
        let long = "x".repeat(250);
        let s = snippet(&long, SNIPPET_CHARS);
        assert_eq!(s.chars().count(), SNIPPET_CHARS + 3);
        assert!(s.ends_with("..."));
    }

    #[test]
    fn test_split_by_parse() {
        assert_eq!(SplitBy::parse("Sentence").unwrap(), SplitBy::Sentence);
        assert_eq!(SplitBy::parse("word").unwrap(), SplitBy::Word);
        assert!(SplitBy::parse("chapter").is_err());
    }

    #[test]
    fn test_legacy_locations() {
        let data = StructuredData {
            locations: vec![Entity::new("Rome", "Capital of the empire")],
            ..Default::default()
        };
        let legacy = data.legacy_locations();
        assert_eq!(legacy[0]["location_name"], "Rome");
        assert_eq!(legacy[0]["description"], "Capital of the empire");
        assert!(!data.is_empty());
        assert!(StructuredData::default().is_empty());
    }

    #[test]
    fn test_retrieved_document_from_document() {
        let mut doc = Document::new("/x/carthage.pdf", "y".repeat(300)).with_split(0);
        doc.set_meta("page_number", serde_json::json!(4));
        doc.score = Some(0.82);
        let r = RetrievedDocument::from(&doc);
        assert_eq!(r.source, "carthage.pdf");
        assert_eq!(r.page, Some(4));
        assert!(r.content_snippet.ends_with("..."));
        assert!((r.score - 0.82).abs() < 1e-6);
    }

    #[test]
    fn test_role_roundtrip() {
        assert_eq!(Role::parse("USER"), Some(Role::User));
        assert_eq!(Role::Assistant.as_str(), "assistant");
        assert_eq!(Role::parse("system"), None);
    }
}
