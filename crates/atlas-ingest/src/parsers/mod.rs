//! Converters from source files to plain text.

mod pdf;
mod text;

pub use pdf::PdfParser;
pub use text::TextParser;

use crate::error::{IngestError, IngestResult};
use atlas_core::Document;
use std::path::Path;

/// Parsed document content.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Extracted text, with `\x0C` between pages where the format has them.
    pub content: String,
    /// Format-specific metadata (`format`, `pages`).
    pub metadata: serde_json::Value,
}

impl ParsedDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: serde_json::json!({}),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Turn the parsed text into a source document for `path`.
    pub fn into_document(self, path: &Path) -> Document {
        let path_str = path.to_string_lossy().to_string();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&path_str)
            .to_string();

        let mut meta = serde_json::json!({
            "file_path": path_str,
            "file_name": file_name,
        });
        if let (Some(map), Some(extra)) = (meta.as_object_mut(), self.metadata.as_object()) {
            for (k, v) in extra {
                map.insert(k.clone(), v.clone());
            }
        }

        Document::new(path_str, self.content).with_meta(meta)
    }
}

/// Trait for document parsers.
pub trait DocumentParser: Send + Sync {
    /// Parse a file at the given path.
    fn parse(&self, path: &Path) -> IngestResult<ParsedDocument>;

    /// Get the supported file extensions.
    fn extensions(&self) -> &[&str];

    /// Check if this parser supports the given extension.
    fn supports(&self, extension: &str) -> bool {
        self.extensions()
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

/// Number of pages in text whose pages are separated by form feeds.
pub(crate) fn page_count(text: &str) -> usize {
    text.matches('\x0C').count() + 1
}

/// Parse a file based on its extension.
pub fn parse_file(path: &Path) -> IngestResult<ParsedDocument> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let parsers: [&dyn DocumentParser; 2] = [&PdfParser, &TextParser];
    parsers
        .iter()
        .find(|p| p.supports(extension))
        .ok_or_else(|| {
            IngestError::UnsupportedFileType(if extension.is_empty() {
                "unknown".to_string()
            } else {
                extension.to_string()
            })
        })?
        .parse(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_extension() {
        let err = parse_file(Path::new("/tmp/notes.docx")).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFileType(ext) if ext == "docx"));
    }

    #[test]
    fn test_into_document_meta() {
        let doc = ParsedDocument::new("Page one\x0CPage two")
            .with_metadata(serde_json::json!({"format": "text", "pages": 2}))
            .into_document(Path::new("/data/pdfs/punic_wars.txt"));

        assert_eq!(doc.source, "/data/pdfs/punic_wars.txt");
        assert_eq!(doc.meta["file_name"], "punic_wars.txt");
        assert_eq!(doc.meta["file_path"], "/data/pdfs/punic_wars.txt");
        assert_eq!(doc.meta["format"], "text");
        assert_eq!(doc.meta["pages"], 2);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(""), 1);
        assert_eq!(page_count("a\x0Cb\x0Cc"), 3);
    }
}
