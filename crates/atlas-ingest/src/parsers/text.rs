//! Plain text document parser.

use super::{page_count, DocumentParser, ParsedDocument};
use crate::error::{IngestError, IngestResult};
use std::path::Path;

/// Parser for UTF-8 text files.
pub struct TextParser;

impl DocumentParser for TextParser {
    fn parse(&self, path: &Path) -> IngestResult<ParsedDocument> {
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let metadata = serde_json::json!({
            "format": "text",
            "pages": page_count(&content),
        });

        Ok(ParsedDocument::new(content).with_metadata(metadata))
    }

    fn extensions(&self) -> &[&str] {
        &["txt", "text"]
    }
}
