//! Splitting source documents into overlapping windows of text units.
//!
//! Text is cut into units (sentences, paragraphs, words or pages). Every unit
//! keeps the delimiter and whitespace that follow it, so the units of a text
//! concatenate back to the original. Chunks are windows of `split_length`
//! units that advance by `split_length - split_overlap`.

use crate::error::{IngestError, IngestResult};
use atlas_config::IngestConfig;
use atlas_core::{Document, SplitBy};

/// One unit of text with its starting offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Unit<'a> {
    text: &'a str,
    byte_start: usize,
    char_start: usize,
}

/// Splits documents into chunk documents.
#[derive(Debug, Clone)]
pub struct DocumentSplitter {
    split_by: SplitBy,
    split_length: usize,
    split_overlap: usize,
}

impl DocumentSplitter {
    pub fn new(split_by: SplitBy, split_length: usize, split_overlap: usize) -> IngestResult<Self> {
        if split_length == 0 {
            return Err(IngestError::InvalidConfig(
                "split_length must be greater than 0".to_string(),
            ));
        }
        if split_overlap >= split_length {
            return Err(IngestError::InvalidConfig(format!(
                "split_overlap ({}) must be smaller than split_length ({})",
                split_overlap, split_length
            )));
        }

        Ok(Self {
            split_by,
            split_length,
            split_overlap,
        })
    }

    pub fn from_config(config: &IngestConfig) -> IngestResult<Self> {
        Self::new(config.split_by, config.split_length, config.split_overlap)
    }

    pub fn split_by(&self) -> SplitBy {
        self.split_by
    }

    pub fn split_length(&self) -> usize {
        self.split_length
    }

    /// Split a source document into chunks that inherit its metadata.
    pub fn split(&self, source: &Document) -> Vec<Document> {
        let text = source.content.as_str();
        let units = self.units(text);
        let step = self.split_length - self.split_overlap;

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < units.len() {
            let end = (start + self.split_length).min(units.len());
            let window = &units[start..end];

            let content: String = window.iter().map(|u| u.text).collect();
            if !content.trim().is_empty() {
                let first = window[0];
                // Page of the first visible character, so folded blank pages count.
                let lead = content.len() - content.trim_start().len();
                let page_number =
                    1 + text[..first.byte_start + lead].matches('\x0C').count();

                let mut meta = source.meta.clone();
                if !meta.is_object() {
                    meta = serde_json::json!({});
                }
                let mut chunk = Document::new(source.source.clone(), content).with_meta(meta);
                chunk.set_meta("source_id", serde_json::json!(source.id));
                chunk.set_meta("split_idx_start", serde_json::json!(first.char_start));
                chunk.set_meta("page_number", serde_json::json!(page_number));
                chunks.push(chunk.with_split(chunks.len()));
            }

            if end == units.len() {
                break;
            }
            start += step;
        }

        chunks
    }

    /// Cut `text` into units. Whitespace-only stretches are folded into the
    /// following unit.
    fn units<'a>(&self, text: &'a str) -> Vec<Unit<'a>> {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let len = chars.len();

        let mut units = Vec::new();
        let mut start = 0usize;
        let mut i = 0usize;

        let skip_whitespace = |mut j: usize| {
            while j < len && chars[j].1.is_whitespace() {
                j += 1;
            }
            j
        };

        while i < len {
            let c = chars[i].1;
            let boundary = match self.split_by {
                SplitBy::Sentence => {
                    if matches!(c, '.' | '!' | '?')
                        && (i + 1 == len || chars[i + 1].1.is_whitespace())
                    {
                        Some(skip_whitespace(i + 1))
                    } else {
                        None
                    }
                }
                SplitBy::Paragraph => {
                    if c == '\n' && i + 1 < len && chars[i + 1].1 == '\n' {
                        Some(skip_whitespace(i + 2))
                    } else {
                        None
                    }
                }
                SplitBy::Word => {
                    if c.is_whitespace() {
                        Some(skip_whitespace(i))
                    } else {
                        None
                    }
                }
                SplitBy::Page => {
                    if c == '\x0C' {
                        Some(i + 1)
                    } else {
                        None
                    }
                }
            };

            match boundary {
                Some(end) => {
                    let byte_start = chars[start].0;
                    let byte_end = if end < len { chars[end].0 } else { text.len() };
                    let piece = &text[byte_start..byte_end];
                    if !piece.trim().is_empty() {
                        units.push(Unit {
                            text: piece,
                            byte_start,
                            char_start: start,
                        });
                        start = end;
                    }
                    i = end.max(i + 1);
                }
                None => i += 1,
            }
        }

        if start < len {
            let byte_start = chars[start].0;
            let piece = &text[byte_start..];
            match units.last_mut() {
                Some(last) if piece.trim().is_empty() => {
                    let from = last.byte_start;
                    last.text = &text[from..];
                }
                _ => units.push(Unit {
                    text: piece,
                    byte_start,
                    char_start: start,
                }),
            }
        }

        units
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(text: &str) -> Document {
        Document::new("/data/pdfs/rome.pdf", text).with_meta(serde_json::json!({
            "file_name": "rome.pdf",
            "format": "pdf",
        }))
    }

    fn unit_texts(splitter: &DocumentSplitter, text: &str) -> Vec<String> {
        splitter
            .units(text)
            .iter()
            .map(|u| u.text.to_string())
            .collect()
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            DocumentSplitter::new(SplitBy::Sentence, 0, 0),
            Err(IngestError::InvalidConfig(_))
        ));
        assert!(matches!(
            DocumentSplitter::new(SplitBy::Word, 3, 3),
            Err(IngestError::InvalidConfig(_))
        ));
        assert!(DocumentSplitter::new(SplitBy::Word, 3, 2).is_ok());
    }

    #[test]
    fn test_sentence_units_reproduce_text() {
        let splitter = DocumentSplitter::new(SplitBy::Sentence, 1, 0).unwrap();
        let text = "Rome was founded in 753 BC. Was it Romulus? Legend says so! The end";
        let units = unit_texts(&splitter, text);

        assert_eq!(
            units,
            vec![
                "Rome was founded in 753 BC. ",
                "Was it Romulus? ",
                "Legend says so! ",
                "The end",
            ]
        );
        assert_eq!(units.concat(), text);
    }

    #[test]
    fn test_decimal_is_not_sentence_end() {
        let splitter = DocumentSplitter::new(SplitBy::Sentence, 1, 0).unwrap();
        let units = unit_texts(&splitter, "It cost 2.5 talents. Then war.");
        assert_eq!(units, vec!["It cost 2.5 talents. ", "Then war."]);
    }

    #[test]
    fn test_word_windows_with_overlap() {
        let splitter = DocumentSplitter::new(SplitBy::Word, 3, 1).unwrap();
        let chunks = splitter.split(&source("a b c d e f g"));
        let contents: Vec<_> = chunks.iter().map(|c| c.content.as_str()).collect();

        assert_eq!(contents, vec!["a b c ", "c d e ", "e f g"]);
        assert_eq!(chunks[1].split_id(), Some(1));
        assert_eq!(chunks[1].meta["split_idx_start"], 4);
    }

    #[test]
    fn test_paragraph_units() {
        let splitter = DocumentSplitter::new(SplitBy::Paragraph, 1, 0).unwrap();
        let text = "First paragraph.\n\nSecond paragraph.\n\n\nThird.";
        let units = unit_texts(&splitter, text);
        assert_eq!(
            units,
            vec!["First paragraph.\n\n", "Second paragraph.\n\n\n", "Third."]
        );
        assert_eq!(units.concat(), text);
    }

    #[test]
    fn test_page_numbers() {
        let splitter = DocumentSplitter::new(SplitBy::Page, 1, 0).unwrap();
        let chunks = splitter.split(&source("Page one.\x0CPage two.\x0CPage three."));

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].page_number(), Some(1));
        assert_eq!(chunks[1].page_number(), Some(2));
        assert_eq!(chunks[2].page_number(), Some(3));
        assert_eq!(chunks[2].content, "Page three.");
    }

    #[test]
    fn test_blank_page_does_not_shift_numbering() {
        let splitter = DocumentSplitter::new(SplitBy::Page, 1, 0).unwrap();
        let chunks = splitter.split(&source("Page one text.\x0C\x0CPage three text.\x0CPage four."));

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].page_number(), Some(1));
        assert_eq!(chunks[1].content.trim(), "Page three text.");
        assert_eq!(chunks[1].page_number(), Some(3));
        assert_eq!(chunks[2].page_number(), Some(4));

        let splitter = DocumentSplitter::new(SplitBy::Sentence, 1, 0).unwrap();
        let chunks = splitter.split(&source("Rome.\x0C\n\x0CCarthage. Egypt."));
        assert_eq!(chunks[1].content, "Carthage. ");
        assert_eq!(chunks[1].page_number(), Some(3));
    }

    #[test]
    fn test_sentence_chunks_track_pages() {
        let splitter = DocumentSplitter::new(SplitBy::Sentence, 2, 0).unwrap();
        let text = "One. Two. Three.\x0CFour. Five.";
        let chunks = splitter.split(&source(text));

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "One. Two. ");
        assert_eq!(chunks[1].content, "Three.\x0CFour. ");
        assert_eq!(chunks[1].page_number(), Some(1));
        assert_eq!(chunks[0].page_number(), Some(1));
        assert_eq!(chunks[2].content, "Five.");
        assert_eq!(chunks[2].page_number(), Some(2));
    }

    #[test]
    fn test_chunk_meta_inherits_source() {
        let splitter = DocumentSplitter::new(SplitBy::Sentence, 10, 0).unwrap();
        let src = source("Carthage was a Phoenician city.");
        let chunks = splitter.split(&src);

        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert_eq!(chunk.meta["file_name"], "rome.pdf");
        assert_eq!(chunk.meta["format"], "pdf");
        assert_eq!(chunk.meta["source_id"], src.id.as_str());
        assert_eq!(chunk.split_id(), Some(0));
        assert_eq!(chunk.meta["split_idx_start"], 0);
        assert_eq!(chunk.source, src.source);
        assert_ne!(chunk.id, src.id);
    }

    #[test]
    fn test_empty_and_whitespace_text() {
        let splitter = DocumentSplitter::new(SplitBy::Word, 5, 0).unwrap();
        assert!(splitter.split(&source("")).is_empty());
        assert!(splitter.split(&source("   \n\n  ")).is_empty());
    }

    #[test]
    fn test_utf8_text() {
        let splitter = DocumentSplitter::new(SplitBy::Word, 2, 0).unwrap();
        let text = "Ἀλέξανδρος ὁ Μέγας conquered Περσία.";
        let chunks = splitter.split(&source(text));
        let joined: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(joined, text);
        let second_start: usize = text
            .split(' ')
            .take(2)
            .map(|w| w.chars().count() + 1)
            .sum();
        assert_eq!(chunks[1].meta["split_idx_start"], second_start);
    }
}
