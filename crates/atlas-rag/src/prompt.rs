//! Prompt templates for grounded answers with entity extraction.

use atlas_core::PromptStyle;

/// Phrase the model is told to use when the documents lack an answer.
pub const NOT_FOUND_PHRASE: &str = "not found in the provided context";

/// System and user messages sent to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

const INSTRUCTIONS: &str = "You are a historical research assistant. Answer the user's question using only the documents below.
Rules:
- Use only information stated in the documents. Do not fabricate facts, names, or dates.
- If the documents do not contain the answer, say that it is \"not found in the provided context\".
- Be concise: a few sentences at most.
- Extract the locations, time periods, and rulers or polities that are relevant to your answer. Keep each description under 30 words.";

const JSON_SHAPE: &str = r#"Respond in exactly this format:
Answer: <conversational answer>
Structured JSON:
{"locations":[{"name":"...","description":"..."}],
 "time_periods":[{"name":"...","description":"..."}],
 "rulers":[{"name":"...","description":"..."}]}
Use empty arrays when nothing applies. Output valid JSON with double quotes and no comments."#;

const SECTIONS_SHAPE: &str = "Respond in exactly this format:
Answer: <conversational answer>
Locations:
- Name: short description
Time Periods:
- Name: short description
Rulers or Polities:
- Name: short description
Write \"- None\" under a heading when nothing applies.";

/// Build the system prompt for `style` around the retrieved context and the
/// formatted conversation so far.
pub fn build_system_prompt(style: PromptStyle, context: &str, history: &str) -> String {
    let shape = match style {
        PromptStyle::Json => JSON_SHAPE,
        PromptStyle::Sections => SECTIONS_SHAPE,
    };

    let mut prompt = String::with_capacity(INSTRUCTIONS.len() + context.len() + 1024);
    prompt.push_str(INSTRUCTIONS);
    prompt.push_str("\n\n");
    prompt.push_str(shape);
    prompt.push_str("\n\nDocuments:\n");
    if context.trim().is_empty() {
        prompt.push_str("(no documents retrieved)");
    } else {
        prompt.push_str(context);
    }

    if !history.trim().is_empty() {
        prompt.push_str("\n\nConversation so far:\n");
        prompt.push_str(history);
    }

    prompt
}

/// Build the full prompt. The user message is the query as typed.
pub fn build_prompt(style: PromptStyle, query: &str, context: &str, history: &str) -> Prompt {
    Prompt {
        system: build_system_prompt(style, context, history),
        user: query.to_string(),
    }
}
