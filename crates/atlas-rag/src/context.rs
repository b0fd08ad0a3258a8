//! Context block assembly and chat-history folding.

use atlas_core::{ChatMessage, Document, Role};

/// Longest slice of a prior user message folded into a retrieval query.
const HISTORY_QUERY_CHARS: usize = 300;

/// Cut `text` to at most `max` characters, ending in `...` when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max < 3 {
        return text.chars().take(max).collect();
    }
    let head: String = text.chars().take(max - 3).collect();
    format!("{}...", head)
}

fn block_header(index: usize, doc: &Document) -> String {
    match doc.page_number() {
        Some(page) => format!("[{}] (source: {}, page {})", index, doc.file_name(), page),
        None => format!("[{}] (source: {})", index, doc.file_name()),
    }
}

/// Render retrieved documents as numbered context blocks.
///
/// Each chunk is cut to `max_chunk_chars`. Blocks are added in order until
/// the next one would exceed `max_context_chars`; the first block is always
/// present, cut to the budget if needed.
pub fn build_context(docs: &[Document], max_chunk_chars: usize, max_context_chars: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;

    for (i, doc) in docs.iter().enumerate() {
        let block = format!(
            "{}\n{}",
            block_header(i + 1, doc),
            truncate_chars(doc.content.trim(), max_chunk_chars)
        );
        let block_len = block.chars().count();
        let separator = if i == 0 { 0 } else { 2 };

        if used + separator + block_len > max_context_chars {
            if i == 0 {
                out = truncate_chars(&block, max_context_chars);
            }
            break;
        }

        if i > 0 {
            out.push_str("\n\n");
        }
        out.push_str(&block);
        used += separator + block_len;
    }

    out
}

/// Fold recent user turns into the text used for similarity search.
pub fn build_retrieval_query(query: &str, history: &[ChatMessage], turns: usize) -> String {
    if turns == 0 {
        return query.to_string();
    }

    let mut previous: Vec<String> = history
        .iter()
        .rev()
        .filter(|m| m.role == Role::User)
        .take(turns)
        .map(|m| truncate_chars(m.content.trim(), HISTORY_QUERY_CHARS))
        .collect();

    if previous.is_empty() {
        return query.to_string();
    }

    previous.reverse();
    previous.push(query.to_string());
    previous.join("\n")
}

/// Keep the last `max_turns` user/assistant exchanges.
pub fn window_history(history: &[ChatMessage], max_turns: usize) -> &[ChatMessage] {
    let keep = max_turns.saturating_mul(2);
    let start = history.len().saturating_sub(keep);
    &history[start..]
}

/// Render history as `User:` / `Assistant:` lines.
pub fn format_history(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|m| {
            let speaker = match m.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            format!("{}: {}", speaker, m.content.trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(file: &str, page: Option<u32>, content: &str) -> Document {
        let mut d = Document::new(format!("/pdfs/{}", file), content);
        d.set_meta("file_name", serde_json::json!(file));
        if let Some(p) = page {
            d.set_meta("page_number", serde_json::json!(p));
        }
        d
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdefghij", 10), "abcdefghij");
        assert_eq!(truncate_chars("abcdefghijk", 10), "abcdefg...");
        assert_eq!(truncate_chars("Ἀθῆναι καὶ Σπάρτη", 8).chars().count(), 8);
        assert_eq!(truncate_chars("abcdef", 2), "ab");
    }

    #[test]
    fn test_build_context_blocks() {
        let docs = vec![
            doc("rome.pdf", Some(3), "Rome was founded."),
            doc("notes.txt", None, "  Carthage fell.  "),
        ];
        let context = build_context(&docs, 1000, 8000);
        assert_eq!(
            context,
            "[1] (source: rome.pdf, page 3)\nRome was founded.\n\n[2] (source: notes.txt)\nCarthage fell."
        );
    }

    #[test]
    fn test_build_context_budget_drops_tail() {
        let docs = vec![
            doc("a.pdf", Some(1), &"a".repeat(40)),
            doc("b.pdf", Some(1), &"b".repeat(40)),
            doc("c.pdf", Some(1), "short"),
        ];
        let context = build_context(&docs, 1000, 100);
        assert!(context.contains("[1]"));
        assert!(!context.contains("[2]"));
        assert!(!context.contains("[3]"));
    }

    #[test]
    fn test_build_context_first_block_always_kept() {
        let docs = vec![doc("a.pdf", Some(1), &"x".repeat(500))];
        let context = build_context(&docs, 1000, 50);
        assert_eq!(context.chars().count(), 50);
        assert!(context.starts_with("[1] (source: a.pdf, page 1)"));
        assert!(context.ends_with("..."));
    }

    #[test]
    fn test_build_context_chunk_truncation() {
        let docs = vec![doc("a.pdf", None, &"y".repeat(50))];
        let context = build_context(&docs, 10, 8000);
        assert!(context.ends_with("yyyyyyy..."));
        assert!(build_context(&[], 10, 10).is_empty());
    }

    #[test]
    fn test_build_retrieval_query() {
        let history = vec![
            ChatMessage::user("s", "Tell me about Carthage"),
            ChatMessage::assistant("s", "Carthage was a city."),
            ChatMessage::user("s", "Who led its army?"),
            ChatMessage::assistant("s", "Hannibal."),
        ];

        assert_eq!(
            build_retrieval_query("Where did he cross?", &history, 2),
            "Tell me about Carthage\nWho led its army?\nWhere did he cross?"
        );
        assert_eq!(
            build_retrieval_query("Where did he cross?", &history, 1),
            "Who led its army?\nWhere did he cross?"
        );
        assert_eq!(build_retrieval_query("q", &history, 0), "q");
        assert_eq!(build_retrieval_query("q", &[], 3), "q");
    }

    #[test]
    fn test_long_history_is_cut() {
        let history = vec![ChatMessage::user("s", "z".repeat(1000))];
        let folded = build_retrieval_query("q", &history, 1);
        let first_line = folded.lines().next().unwrap();
        assert_eq!(first_line.chars().count(), 300);
    }

    #[test]
    fn test_window_and_format_history() {
        let history: Vec<ChatMessage> = (0..6)
            .map(|i| {
                if i % 2 == 0 {
                    ChatMessage::user("s", format!("q{}", i))
                } else {
                    ChatMessage::assistant("s", format!("a{}", i))
                }
            })
            .collect();

        let window = window_history(&history, 2);
        assert_eq!(window.len(), 4);
        assert_eq!(window[0].content, "q2");

        assert_eq!(format_history(&window[..2]), "User: q2\nAssistant: a3");
        assert_eq!(window_history(&history, 10).len(), 6);
    }
}
