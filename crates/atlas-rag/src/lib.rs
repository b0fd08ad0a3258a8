//! Atlas RAG - retrieval-augmented question answering over indexed documents.
//!
//! A turn folds recent chat history into the retrieval query, pulls the
//! closest chunks from the vector store, builds a grounded prompt, asks the
//! configured model and parses its reply into an answer plus locations, time
//! periods and rulers.

mod context;
mod engine;
mod error;
mod parser;
mod prompt;
mod retrieval;

pub use context::{build_context, build_retrieval_query, format_history, truncate_chars, window_history};
pub use engine::{QueryEngine, QueryResponse};
pub use error::{RagError, RagResult};
pub use parser::{parse_response, ParsedResponse, ResponseFormat, EMPTY_ANSWER};
pub use prompt::{build_prompt, build_system_prompt, Prompt, NOT_FOUND_PHRASE};
pub use retrieval::{batch_retrieve, read_questions, BatchReport, Retriever};
