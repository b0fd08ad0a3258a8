//! The question-answering pipeline: history, retrieval, prompt, generation,
//! parsing and persistence for one session turn.

use crate::context::{build_context, build_retrieval_query, format_history, window_history};
use crate::error::{RagError, RagResult};
use crate::parser::{parse_response, ResponseFormat};
use crate::prompt::build_prompt;
use crate::retrieval::Retriever;
use atlas_config::{ChatConfig, Config, RagConfig};
use atlas_core::{ChatMessage, RetrievedDocument, StructuredData};
use atlas_db::Database;
use atlas_llm::{build_generator, Embedder, Generator, OllamaClient};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of one answered query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub structured_data: StructuredData,
    pub retrieved_documents: Vec<RetrievedDocument>,
    pub raw_llm_output: String,
    pub format: ResponseFormat,
}

/// Answers questions against the indexed documents, one session at a time.
#[derive(Clone)]
pub struct QueryEngine {
    db: Database,
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    embedding_label: String,
    rag: RagConfig,
    chat: ChatConfig,
    min_query_chars: usize,
    max_query_chars: usize,
}

impl QueryEngine {
    pub fn new(
        db: Database,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        config: &Config,
    ) -> Self {
        let embedding_label = embedder.model_name().to_string();
        let retriever = Retriever::from_config(db.clone(), embedder, &config.embedding, &config.retrieval);
        Self {
            db,
            retriever,
            generator,
            embedding_label,
            rag: config.rag.clone(),
            chat: config.chat.clone(),
            min_query_chars: config.rag.min_query_chars,
            max_query_chars: config.rag.max_query_chars,
        }
    }

    /// Build the engine with the configured embedding server and generator.
    pub fn from_config(config: &Config, db: Database) -> RagResult<Self> {
        let embedder: Arc<dyn Embedder> = Arc::new(OllamaClient::from_embedding_config(&config.embedding)?);
        let generator: Arc<dyn Generator> = Arc::from(build_generator(&config.llm)?);
        info!(
            "Query engine ready (embedder: {}, generator: {})",
            embedder.model_name(),
            generator.model_name()
        );
        Ok(Self::new(db, embedder, generator, config))
    }

    /// Override the accepted query length range, in characters.
    pub fn with_query_limits(mut self, min_chars: usize, max_chars: usize) -> Self {
        self.min_query_chars = min_chars;
        self.max_query_chars = max_chars;
        self
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn generator(&self) -> &Arc<dyn Generator> {
        &self.generator
    }

    /// Check that `query` is non-blank and within the length limits.
    pub fn validate_query(&self, query: &str) -> RagResult<()> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::InvalidQuery("query must not be empty".to_string()));
        }

        let len = query.chars().count();
        if len < self.min_query_chars {
            return Err(RagError::InvalidQuery(format!(
                "query must be at least {} characters",
                self.min_query_chars
            )));
        }
        if len > self.max_query_chars {
            return Err(RagError::InvalidQuery(format!(
                "query must be at most {} characters",
                self.max_query_chars
            )));
        }
        Ok(())
    }

    /// Answer `query` in `session`, recording both turns in the history.
    ///
    /// Nothing is written when generation fails.
    pub async fn query(&self, session: &str, query: &str) -> RagResult<QueryResponse> {
        self.validate_query(query)?;
        let query = query.trim();

        let history = self.recent_history(session).await?;
        let retrieval_query = build_retrieval_query(query, &history, self.chat.retrieval_history_turns);
        let documents = self.retriever.retrieve(&retrieval_query, None).await?;

        let context = build_context(&documents, self.rag.max_chunk_chars, self.rag.max_context_chars);
        let history_text = format_history(window_history(&history, self.chat.max_history_turns));
        let prompt = build_prompt(self.rag.prompt_style, query, &context, &history_text);

        debug!(
            "Prompt built: {} context chars, {} history messages",
            context.len(),
            history.len()
        );

        let raw = self.generator.generate(&prompt.system, &prompt.user).await?;
        let parsed = parse_response(&raw);
        debug!("Parsed model reply as {}", parsed.format);

        let retrieved: Vec<RetrievedDocument> = documents.iter().map(RetrievedDocument::from).collect();
        let response = QueryResponse {
            answer: parsed.answer,
            structured_data: parsed.structured,
            retrieved_documents: retrieved,
            raw_llm_output: raw,
            format: parsed.format,
        };

        self.record_turn(session, query, &response).await?;
        Ok(response)
    }

    async fn recent_history(&self, session: &str) -> RagResult<Vec<ChatMessage>> {
        let db = self.db.clone();
        let session = session.to_string();
        let limit = self.chat.max_history_turns.max(self.chat.retrieval_history_turns) * 2;
        tokio::task::spawn_blocking(move || db.recent_messages(&session, limit))
            .await
            .map_err(|e| RagError::Task(e.to_string()))?
            .map_err(RagError::from)
    }

    async fn record_turn(&self, session: &str, query: &str, response: &QueryResponse) -> RagResult<()> {
        let user = ChatMessage::user(session, query).with_embedding_label(&self.embedding_label);
        let assistant = ChatMessage::assistant(session, &response.answer)
            .with_embedding_label(&self.embedding_label)
            .with_structured_data(serde_json::to_value(&response.structured_data).unwrap_or_default())
            .with_retrieved_documents(serde_json::to_value(&response.retrieved_documents).unwrap_or_default());

        let db = self.db.clone();
        tokio::task::spawn_blocking(move || -> RagResult<()> {
            db.append_message(&user)?;
            db.append_message(&assistant)?;
            Ok(())
        })
        .await
        .map_err(|e| RagError::Task(e.to_string()))?
    }

    /// Full history of `session`, oldest first.
    pub fn history(&self, session: &str) -> RagResult<Vec<ChatMessage>> {
        Ok(self.db.list_messages(session)?)
    }

    /// Delete the history of `session`, returning the number of messages removed.
    pub fn clear_history(&self, session: &str) -> RagResult<usize> {
        let deleted = self.db.clear_history(session)?;
        info!("Cleared {} messages from session {}", deleted, session);
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use atlas_core::{Document, DuplicatePolicy, Role};
    use atlas_llm::{LlmError, LlmResult};
    use std::sync::Mutex;

    struct AxisEmbedder;

    #[async_trait]
    impl Embedder for AxisEmbedder {
        async fn embed(&self, text: &str) -> LlmResult<Vec<f32>> {
            let lower = text.to_lowercase();
            Ok(vec![
                if lower.contains("carthage") { 1.0 } else { 0.0 },
                if lower.contains("nile") { 1.0 } else { 0.0 },
                0.1,
            ])
        }

        fn model_name(&self) -> &str {
            "axis-embedder"
        }
    }

    /// Returns a canned reply and records the prompts it was given.
    struct ScriptedGenerator {
        reply: Option<String>,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedGenerator {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(&self, system: &str, user: &str) -> LlmResult<String> {
            self.prompts
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            self.reply.clone().ok_or(LlmError::Timeout { seconds: 1 })
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    const REPLY: &str = r#"Answer: Hannibal led Carthage's army.
Structured JSON:
{"locations":[{"name":"Carthage","description":"North African city"}],"time_periods":[],"rulers":[{"name":"Hannibal","description":"General"}]}"#;

    fn engine(generator: Arc<ScriptedGenerator>) -> QueryEngine {
        let db = Database::open_in_memory().unwrap();
        let mut carthage = Document::new("/pdfs/carthage.pdf", "Hannibal led the army of Carthage.")
            .with_split(0)
            .with_embedding(vec![1.0, 0.0, 0.1]);
        carthage.set_meta("file_name", serde_json::json!("carthage.pdf"));
        carthage.set_meta("page_number", serde_json::json!(4));
        let nile = Document::new("/pdfs/egypt.pdf", "The Nile flooded every year.")
            .with_split(0)
            .with_embedding(vec![0.0, 1.0, 0.1]);
        db.write_documents(&[carthage, nile], DuplicatePolicy::Overwrite, "axis-embedder")
            .unwrap();

        QueryEngine::new(db, Arc::new(AxisEmbedder), generator, &Config::default())
    }

    #[tokio::test]
    async fn test_query_answers_and_records_history() {
        let generator = Arc::new(ScriptedGenerator::replying(REPLY));
        let engine = engine(generator.clone());

        let response = engine.query("s1", "  Who led Carthage?  ").await.unwrap();
        assert_eq!(response.answer, "Hannibal led Carthage's army.");
        assert_eq!(response.format, ResponseFormat::Json);
        assert_eq!(response.structured_data.locations[0].name, "Carthage");
        assert_eq!(response.retrieved_documents[0].source, "carthage.pdf");
        assert_eq!(response.retrieved_documents[0].page, Some(4));
        assert_eq!(response.raw_llm_output, REPLY);

        let prompts = generator.prompts.lock().unwrap().clone();
        assert_eq!(prompts[0].1, "Who led Carthage?");
        assert!(prompts[0].0.contains("[1] (source: carthage.pdf, page 4)"));

        let history = engine.history("s1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "Who led Carthage?");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].embedding, "axis-embedder");
        assert_eq!(
            history[1].structured_data.as_ref().unwrap()["rulers"][0]["name"],
            "Hannibal"
        );
        assert!(engine.history("other").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_follow_up_uses_history() {
        let generator = Arc::new(ScriptedGenerator::replying(REPLY));
        let engine = engine(generator.clone());

        engine.query("s1", "Tell me about Carthage").await.unwrap();
        let response = engine.query("s1", "Who was its general?").await.unwrap();

        // The folded retrieval query still finds the Carthage chunk.
        assert_eq!(response.retrieved_documents[0].source, "carthage.pdf");

        let prompts = generator.prompts.lock().unwrap().clone();
        assert!(!prompts[0].0.contains("Conversation so far:"));
        assert!(prompts[1]
            .0
            .contains("Conversation so far:\nUser: Tell me about Carthage\nAssistant: Hannibal led Carthage's army."));
        assert_eq!(engine.history("s1").unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_generation_failure_writes_nothing() {
        let engine = engine(Arc::new(ScriptedGenerator::failing()));
        let result = engine.query("s1", "Who led Carthage?").await;
        assert!(matches!(result, Err(RagError::Llm(LlmError::Timeout { .. }))));
        assert!(engine.history("s1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_reply_gets_placeholder_answer() {
        let engine = engine(Arc::new(ScriptedGenerator::replying("")));
        let response = engine.query("s1", "Who led Carthage?").await.unwrap();

        assert_eq!(response.answer, crate::EMPTY_ANSWER);
        assert!(response.structured_data.is_empty());
        assert_eq!(engine.history("s1").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_query_validation() {
        let generator = Arc::new(ScriptedGenerator::replying(REPLY));
        let engine = engine(generator.clone()).with_query_limits(5, 20);

        assert!(matches!(engine.query("s1", "   ").await, Err(RagError::InvalidQuery(_))));
        assert!(matches!(engine.query("s1", "abc").await, Err(RagError::InvalidQuery(_))));
        assert!(matches!(
            engine.query("s1", &"x".repeat(21)).await,
            Err(RagError::InvalidQuery(_))
        ));
        assert!(generator.prompts.lock().unwrap().is_empty());
        assert!(engine.validate_query("Who was Hannibal?").is_ok());
    }

    #[tokio::test]
    async fn test_clear_history() {
        let engine = engine(Arc::new(ScriptedGenerator::replying(REPLY)));
        engine.query("s1", "Who led Carthage?").await.unwrap();
        engine.query("s2", "Who led Carthage?").await.unwrap();

        assert_eq!(engine.clear_history("s1").unwrap(), 2);
        assert!(engine.history("s1").unwrap().is_empty());
        assert_eq!(engine.history("s2").unwrap().len(), 2);
        assert_eq!(engine.clear_history("s1").unwrap(), 0);
    }
}
