//! Atlas Ingest - PDF ingestion and indexing pipeline.
//!
//! This crate provides:
//! - File discovery by glob pattern
//! - PDF and plain-text conversion
//! - Cleaning and unit-based splitting with page tracking
//! - Embedding and writing chunks to the document store
//! - A dump of the indexed documents for inspection

mod cleaner;
mod discovery;
mod error;
mod ingestor;
mod parsers;
mod report;
mod splitter;

pub use cleaner::DocumentCleaner;
pub use discovery::discover_files;
pub use error::{IngestError, IngestResult};
pub use ingestor::{FileOutcome, IngestEvent, Ingestor};
pub use parsers::{parse_file, DocumentParser, ParsedDocument, PdfParser, TextParser};
pub use report::{dump_index, format_dump, IngestReport};
pub use splitter::DocumentSplitter;
