//! Turning free-form model replies into an answer plus typed entities.
//!
//! Replies are expected as `Answer: ...` followed by either a
//! `Structured JSON:` object or labelled bullet sections, but models drift:
//! labels get bolded, JSON arrives fenced, truncated or with trailing commas,
//! and sometimes there is no structure at all. Parsing never fails; the worst
//! case is the whole reply as a plain-text answer.

use atlas_core::{Entity, StructuredData};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

/// Answer used when the model returned nothing.
pub const EMPTY_ANSWER: &str = "No answer generated.";

static JSON_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\*\*|__)?[ \t]*structured[ \t_-]*json[ \t]*(?:\*\*|__)?[ \t]*:[ \t]*(?:\*\*|__)?")
        .expect("valid JSON label regex")
});

static JSON_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```[ \t]*json[ \t]*\n?(.*?)(?:```|\z)").expect("valid fence regex")
});

static FENCE_MARK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z]*").expect("valid fence marker regex"));

static ANSWER_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:\*\*|__)?[ \t]*answer[ \t]*(?:\*\*|__)?[ \t]*:[ \t]*(?:\*\*|__)?\s*")
        .expect("valid answer label regex")
});

static SECTION_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:#{1,6}[ \t]*)?(?:\*\*|__)?[ \t]*(locations?|time[ \t]+periods?|rulers[ \t]+or[ \t]+polities|rulers?|polities)[ \t]*(?:\*\*|__)?[ \t]*:[ \t]*(?:\*\*|__)?(.*)$",
    )
    .expect("valid section header regex")
});

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*•]|\d+[.)])\s+(.*)$").expect("valid bullet regex"));

static TRAILING_PAREN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)\s*\(([^()]*)\)\s*$").expect("valid paren regex"));

/// How the structure of a reply was recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    Json,
    RepairedJson,
    Sections,
    PlainText,
    MalformedJson,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::Json => "json",
            ResponseFormat::RepairedJson => "repaired_json",
            ResponseFormat::Sections => "sections",
            ResponseFormat::PlainText => "plain_text",
            ResponseFormat::MalformedJson => "malformed_json",
        }
    }
}

impl std::fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parsed model reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedResponse {
    pub answer: String,
    pub structured: StructuredData,
    pub format: ResponseFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntityKind {
    Location,
    TimePeriod,
    Ruler,
}

impl EntityKind {
    fn name_keys(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Location => &["name", "location_name", "location", "place"],
            EntityKind::TimePeriod => &["name", "period", "time_period", "era"],
            EntityKind::Ruler => &["name", "ruler", "polity"],
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase().replace([' ', '-'], "_");
        match key.as_str() {
            "locations" | "location" | "places" => Some(EntityKind::Location),
            "time_periods" | "timeperiods" | "time_period" | "periods" => Some(EntityKind::TimePeriod),
            "rulers" | "rulers_or_polities" | "polities" | "ruler" => Some(EntityKind::Ruler),
            _ => None,
        }
    }

    fn from_header(header: &str) -> Self {
        let header = header.to_lowercase();
        if header.starts_with("location") {
            EntityKind::Location
        } else if header.starts_with("time") {
            EntityKind::TimePeriod
        } else {
            EntityKind::Ruler
        }
    }
}

fn bucket(data: &mut StructuredData, kind: EntityKind) -> &mut Vec<Entity> {
    match kind {
        EntityKind::Location => &mut data.locations,
        EntityKind::TimePeriod => &mut data.time_periods,
        EntityKind::Ruler => &mut data.rulers,
    }
}

/// Parse a raw model reply.
pub fn parse_response(raw: &str) -> ParsedResponse {
    let text = raw.trim();
    if text.is_empty() {
        return ParsedResponse {
            answer: EMPTY_ANSWER.to_string(),
            structured: StructuredData::default(),
            format: ResponseFormat::PlainText,
        };
    }

    if let Some((answer_part, payload)) = locate_json(text) {
        return parse_json_reply(text, answer_part, payload);
    }

    if let Some(parsed) = parse_sections(text) {
        return parsed;
    }

    ParsedResponse {
        answer: clean_answer(text),
        structured: StructuredData::default(),
        format: ResponseFormat::PlainText,
    }
}

/// Split the reply into answer text and JSON payload, if it carries one.
fn locate_json(text: &str) -> Option<(&str, &str)> {
    if let Some(m) = JSON_LABEL_RE.find(text) {
        return Some((&text[..m.start()], &text[m.end()..]));
    }

    if let Some(caps) = JSON_FENCE_RE.captures(text) {
        let whole = caps.get(0)?;
        let body = caps.get(1).map(|b| b.as_str()).unwrap_or("");
        return Some((&text[..whole.start()], body));
    }

    if (text.starts_with('{') || text.starts_with('[')) && is_bare_json(text) {
        return Some(("", text));
    }

    None
}

/// Whether a reply opening with `{` or `[` is a JSON payload rather than
/// prose that starts with a bracket, such as a `[1]` citation.
fn is_bare_json(text: &str) -> bool {
    let Some(candidate) = extract_json_candidate(text) else {
        return false;
    };
    if candidate.len() == text.len() {
        return true;
    }

    match decode_candidate(candidate) {
        Some((Value::Object(_), _)) => true,
        Some((Value::Array(items), _)) => {
            !items.is_empty()
                && items
                    .iter()
                    .all(|item| matches!(item, Value::Object(_) | Value::String(_)))
        }
        _ => false,
    }
}

/// Decode strictly, then once more after repair.
fn decode_candidate(candidate: &str) -> Option<(Value, ResponseFormat)> {
    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return Some((value, ResponseFormat::Json));
    }
    serde_json::from_str::<Value>(&repair_json(candidate))
        .ok()
        .map(|value| (value, ResponseFormat::RepairedJson))
}

fn parse_json_reply(raw: &str, answer_part: &str, payload: &str) -> ParsedResponse {
    let mut answer = clean_answer(answer_part);
    let payload = FENCE_MARK_RE.replace_all(payload, "");

    let decoded = extract_json_candidate(&payload).and_then(decode_candidate);

    match decoded {
        Some((value, format)) => {
            if answer.is_empty() {
                if let Some(inline) = value.get("answer").and_then(|a| a.as_str()) {
                    answer = clean_answer(inline);
                }
            }
            ParsedResponse {
                answer,
                structured: structured_from_value(&value),
                format,
            }
        }
        None => {
            if answer.is_empty() {
                answer = raw.to_string();
            }
            ParsedResponse {
                answer,
                structured: StructuredData::default(),
                format: ResponseFormat::MalformedJson,
            }
        }
    }
}

/// Strip a leading `Answer:` label and surrounding whitespace.
fn clean_answer(text: &str) -> String {
    ANSWER_LABEL_RE.replace(text.trim(), "").trim().to_string()
}

/// First balanced JSON object or array in `text`, or everything from the
/// first opener when it never closes.
pub(crate) fn extract_json_candidate(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let body = &text[start..];

    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in body.char_indices() {
        if in_string {
            if escape_next {
                escape_next = false;
            } else if ch == '\\' {
                escape_next = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.last() == Some(&ch) {
                    stack.pop();
                }
                if stack.is_empty() {
                    return Some(&body[..i + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    Some(body.trim_end())
}

fn trim_trailing_comma(out: &mut String) {
    let trimmed_len = out.trim_end().len();
    if out[..trimmed_len].ends_with(',') {
        out.truncate(trimmed_len - 1);
    }
}

/// Best-effort fix-up of almost-JSON.
///
/// Handles smart quotes, `//` comments, bare object keys, trailing commas and
/// missing closing brackets. Text inside strings is left alone.
pub(crate) fn repair_json(input: &str) -> String {
    let text = input
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    let mut out = String::with_capacity(text.len() + 8);
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape_next = false;
    let mut i = 0;

    while i < len {
        let c = chars[i];

        if in_string {
            out.push(c);
            if escape_next {
                escape_next = false;
            } else if c == '\\' {
                escape_next = true;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < len && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '{' => {
                stack.push('}');
                out.push(c);
            }
            '[' => {
                stack.push(']');
                out.push(c);
            }
            '}' | ']' => {
                trim_trailing_comma(&mut out);
                if stack.last() == Some(&c) {
                    stack.pop();
                }
                out.push(c);
            }
            c if (c.is_alphabetic() || c == '_')
                && stack.last() == Some(&'}')
                && matches!(out.trim_end().chars().last(), Some('{') | Some(',')) =>
            {
                let start = i;
                while i < len && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();

                let mut j = i;
                while j < len && chars[j].is_whitespace() {
                    j += 1;
                }
                if chars.get(j) == Some(&':') {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                } else {
                    out.push_str(&word);
                }
                continue;
            }
            _ => out.push(c),
        }
        i += 1;
    }

    if in_string {
        out.push('"');
    }
    while let Some(closer) = stack.pop() {
        trim_trailing_comma(&mut out);
        out.push(closer);
    }

    out
}

fn structured_from_value(value: &Value) -> StructuredData {
    let mut data = StructuredData::default();

    match value {
        Value::Array(items) => {
            data.locations = entities_from_items(items, EntityKind::Location);
        }
        Value::Object(map) => {
            for (key, v) in map {
                let Some(kind) = EntityKind::from_key(key) else {
                    continue;
                };
                let items = match v {
                    Value::Array(items) => items.clone(),
                    Value::Null => Vec::new(),
                    other => vec![other.clone()],
                };
                bucket(&mut data, kind).extend(entities_from_items(&items, kind));
            }
        }
        _ => {}
    }

    data
}

fn entities_from_items(items: &[Value], kind: EntityKind) -> Vec<Entity> {
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(Entity::new(s.trim(), "")),
            Value::Object(map) => {
                let name = kind
                    .name_keys()
                    .iter()
                    .find_map(|k| map.get(*k).and_then(|v| v.as_str()).filter(|s| !s.trim().is_empty()))
                    .unwrap_or("");
                let description = ["description", "relevance"]
                    .iter()
                    .find_map(|k| map.get(*k).and_then(|v| v.as_str()))
                    .unwrap_or("");
                Some(Entity::new(name.trim(), description.trim()))
            }
            _ => None,
        })
        .filter(|e| !e.name.is_empty())
        .collect()
}

fn is_none_marker(text: &str) -> bool {
    let t = text.trim().trim_end_matches('.').trim().to_lowercase();
    matches!(
        t.as_str(),
        "none" | "n/a" | "na" | "not mentioned" | "none mentioned" | "not applicable" | "-"
    )
}

/// Split a bullet's text into an entity.
fn entity_from_bullet(text: &str) -> Option<Entity> {
    let text = text.replace("**", "").replace("__", "");
    let text = text.trim();
    if text.is_empty() || is_none_marker(text) {
        return None;
    }

    let (name, description) = if let Some((name, desc)) = text.split_once(": ") {
        (name.to_string(), desc.to_string())
    } else if let Some((name, desc)) = split_on_dash(text) {
        (name, desc)
    } else if let Some(caps) = TRAILING_PAREN_RE.captures(text) {
        (caps[1].to_string(), caps[2].to_string())
    } else {
        (text.to_string(), String::new())
    };

    let name = name.trim().trim_end_matches(':').trim();
    if name.is_empty() || is_none_marker(name) {
        return None;
    }
    Some(Entity::new(name, description.trim()))
}

fn split_on_dash(text: &str) -> Option<(String, String)> {
    let hyphen = text.find(" - ").map(|i| (i, " - ".len()));
    let en_dash = text.find(" \u{2013} ").map(|i| (i, " \u{2013} ".len()));
    let (idx, sep_len) = match (hyphen, en_dash) {
        (Some(h), Some(e)) => {
            if h.0 <= e.0 {
                h
            } else {
                e
            }
        }
        (Some(h), None) => h,
        (None, Some(e)) => e,
        (None, None) => return None,
    };
    Some((text[..idx].to_string(), text[idx + sep_len..].to_string()))
}

/// Parse comma-separated inline entities such as `Rome, Carthage`.
fn inline_entities(text: &str) -> Vec<Entity> {
    let text = text.trim().trim_end_matches("**").trim();
    if text.is_empty() || is_none_marker(text) {
        return Vec::new();
    }
    text.split(',').filter_map(entity_from_bullet).collect()
}

fn parse_section_body(inline: &str, body: &str) -> Vec<Entity> {
    let mut entities = Vec::new();
    // Index of the entity that non-bullet lines extend.
    let mut current: Option<usize> = None;

    let inline = inline.trim();
    if let Some(caps) = BULLET_RE.captures(inline) {
        if let Some(e) = entity_from_bullet(&caps[1]) {
            entities.push(e);
            current = Some(entities.len() - 1);
        }
    } else {
        entities.extend(inline_entities(inline));
    }

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = BULLET_RE.captures(line) {
            current = match entity_from_bullet(&caps[1]) {
                Some(e) => {
                    entities.push(e);
                    Some(entities.len() - 1)
                }
                None => None,
            };
            continue;
        }

        match current {
            Some(idx) => {
                let entity = &mut entities[idx];
                if entity.description.is_empty() {
                    entity.description = line.to_string();
                } else {
                    entity.description = format!("{} {}", entity.description, line);
                }
            }
            None => entities.extend(inline_entities(line)),
        }
    }

    entities
}

fn parse_sections(text: &str) -> Option<ParsedResponse> {
    let headers: Vec<_> = SECTION_HEADER_RE.captures_iter(text).collect();
    let first = headers.first()?.get(0)?;

    let mut structured = StructuredData::default();
    for (idx, caps) in headers.iter().enumerate() {
        let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let inline = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        let body_end = headers
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());
        let body = &text[whole.end()..body_end];

        let kind = EntityKind::from_header(label.as_str());
        bucket(&mut structured, kind).extend(parse_section_body(inline, body));
    }

    Some(ParsedResponse {
        answer: clean_answer(&text[..first.start()]),
        structured,
        format: ResponseFormat::Sections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(entities: &[Entity]) -> Vec<&str> {
        entities.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_empty_reply() {
        let parsed = parse_response("   \n ");
        assert_eq!(parsed.answer, EMPTY_ANSWER);
        assert_eq!(parsed.format, ResponseFormat::PlainText);
        assert!(parsed.structured.is_empty());
    }

    #[test]
    fn test_well_formed_json_reply() {
        let raw = r#"Answer: Hannibal crossed the Alps in 218 BC.
Structured JSON:
{"locations":[{"name":"Alps","description":"Mountain range crossed by Hannibal"}],
 "time_periods":[{"name":"Second Punic War","description":"218-201 BC"}],
 "rulers":[{"name":"Hannibal Barca","description":"Carthaginian general"}]}"#;

        let parsed = parse_response(raw);
        assert_eq!(parsed.format, ResponseFormat::Json);
        assert_eq!(parsed.answer, "Hannibal crossed the Alps in 218 BC.");
        assert_eq!(names(&parsed.structured.locations), vec!["Alps"]);
        assert_eq!(
            parsed.structured.time_periods[0].description,
            "218-201 BC"
        );
        assert_eq!(names(&parsed.structured.rulers), vec!["Hannibal Barca"]);
    }

    #[test]
    fn test_bold_label_and_fence() {
        let raw = "**Answer:** Rome.\n\n**Structured JSON:**\n```json\n{\"locations\": [{\"name\": \"Rome\", \"description\": \"Capital\"}], \"time_periods\": [], \"rulers\": []}\n```";
        let parsed = parse_response(raw);
        assert_eq!(parsed.format, ResponseFormat::Json);
        assert_eq!(parsed.answer, "Rome.");
        assert_eq!(names(&parsed.structured.locations), vec!["Rome"]);
    }

    #[test]
    fn test_fenced_block_without_label() {
        let raw = "The city was Carthage.\n```json\n{\"locations\":[\"Carthage\"]}\n```";
        let parsed = parse_response(raw);
        assert_eq!(parsed.format, ResponseFormat::Json);
        assert_eq!(parsed.answer, "The city was Carthage.");
        assert_eq!(parsed.structured.locations[0], Entity::new("Carthage", ""));
    }

    #[test]
    fn test_repaired_json() {
        let raw = "Answer: Egypt.\nStructured JSON: {locations: [{name: \u{201C}Thebes\u{201D}, description: \"Capital, for a time\",},], // trailing\n \"rulers\": [{\"name\": \"Ramesses II\"}]";
        let parsed = parse_response(raw);
        assert_eq!(parsed.format, ResponseFormat::RepairedJson);
        assert_eq!(parsed.answer, "Egypt.");
        assert_eq!(parsed.structured.locations[0].name, "Thebes");
        assert_eq!(parsed.structured.locations[0].description, "Capital, for a time");
        assert_eq!(names(&parsed.structured.rulers), vec!["Ramesses II"]);
    }

    #[test]
    fn test_truncated_json_is_closed() {
        let raw = "Answer: Persia.\nStructured JSON: {\"locations\": [{\"name\": \"Persepolis\", \"description\": \"Ceremonial capital\"}";
        let parsed = parse_response(raw);
        assert_eq!(parsed.format, ResponseFormat::RepairedJson);
        assert_eq!(names(&parsed.structured.locations), vec!["Persepolis"]);
    }

    #[test]
    fn test_malformed_json_keeps_answer() {
        let raw = "Answer: Athens.\nStructured JSON: {\"locations\": [{\"name\" \"Athens\" ::}]}";
        let parsed = parse_response(raw);
        assert_eq!(parsed.format, ResponseFormat::MalformedJson);
        assert_eq!(parsed.answer, "Athens.");
        assert!(parsed.structured.is_empty());

        let raw = "Structured JSON: {{{ nonsense :::";
        let parsed = parse_response(raw);
        assert_eq!(parsed.format, ResponseFormat::MalformedJson);
        assert_eq!(parsed.answer, raw);
    }

    #[test]
    fn test_bare_array_means_locations() {
        let raw = r#"[{"location_name": "Babylon", "description": "Mesopotamian city"}, {"place": "Ur", "relevance": "Sumerian city"}]"#;
        let parsed = parse_response(raw);
        assert_eq!(parsed.format, ResponseFormat::Json);
        assert_eq!(parsed.answer, "");
        assert_eq!(names(&parsed.structured.locations), vec!["Babylon", "Ur"]);
        assert_eq!(parsed.structured.locations[1].description, "Sumerian city");
    }

    #[test]
    fn test_leading_citation_is_prose() {
        let raw = "[1] Rome was founded in 753 BC according to the documents.";
        let parsed = parse_response(raw);
        assert_eq!(parsed.format, ResponseFormat::PlainText);
        assert_eq!(parsed.answer, raw);
        assert!(parsed.structured.is_empty());

        let raw = "[2] Carthage fell in 146 BC.\nLocations:\n- Carthage: North Africa";
        let parsed = parse_response(raw);
        assert_eq!(parsed.format, ResponseFormat::Sections);
        assert_eq!(parsed.answer, "[2] Carthage fell in 146 BC.");
        assert_eq!(names(&parsed.structured.locations), vec!["Carthage"]);
    }

    #[test]
    fn test_bare_object_with_trailing_text() {
        let raw = r#"{"locations": [{"name": "Memphis"}]} Hope this helps."#;
        let parsed = parse_response(raw);
        assert_eq!(parsed.format, ResponseFormat::Json);
        assert_eq!(names(&parsed.structured.locations), vec!["Memphis"]);
    }

    #[test]
    fn test_key_and_name_aliases() {
        let raw = r#"{"answer": "The Bronze Age.", "timePeriods": [{"era": "Bronze Age"}], "rulers_or_polities": [{"polity": "Hittite Empire"}, {"name": ""}], "locations": "Anatolia"}"#;
        let parsed = parse_response(raw);
        assert_eq!(parsed.answer, "The Bronze Age.");
        assert_eq!(names(&parsed.structured.time_periods), vec!["Bronze Age"]);
        assert_eq!(names(&parsed.structured.rulers), vec!["Hittite Empire"]);
        assert_eq!(names(&parsed.structured.locations), vec!["Anatolia"]);
    }

    #[test]
    fn test_sections_reply() {
        let raw = "Answer: The Punic Wars were fought between Rome and Carthage.

**Locations:**
- Rome: Capital of the Roman Republic
- **Carthage** - Phoenician city in North Africa
  destroyed in 146 BC

## Time Periods:
1. Punic Wars (264–146 BC)

Rulers or Polities:
* None";

        let parsed = parse_response(raw);
        assert_eq!(parsed.format, ResponseFormat::Sections);
        assert_eq!(
            parsed.answer,
            "The Punic Wars were fought between Rome and Carthage."
        );
        assert_eq!(names(&parsed.structured.locations), vec!["Rome", "Carthage"]);
        assert_eq!(
            parsed.structured.locations[1].description,
            "Phoenician city in North Africa destroyed in 146 BC"
        );
        assert_eq!(
            parsed.structured.time_periods[0],
            Entity::new("Punic Wars", "264–146 BC")
        );
        assert!(parsed.structured.rulers.is_empty());
    }

    #[test]
    fn test_inline_section_list() {
        let raw = "Answer: Two cities.\nLocations: Rome, Carthage\nRulers: N/A";
        let parsed = parse_response(raw);
        assert_eq!(parsed.format, ResponseFormat::Sections);
        assert_eq!(names(&parsed.structured.locations), vec!["Rome", "Carthage"]);
        assert!(parsed.structured.rulers.is_empty());
    }

    #[test]
    fn test_plain_text_reply() {
        let parsed = parse_response("Answer: This is not found in the provided context.");
        assert_eq!(parsed.format, ResponseFormat::PlainText);
        assert_eq!(parsed.answer, "This is not found in the provided context.");

        let parsed = parse_response("Just a sentence about locations of trade.");
        assert_eq!(parsed.format, ResponseFormat::PlainText);
        assert_eq!(parsed.answer, "Just a sentence about locations of trade.");
    }

    #[test]
    fn test_extract_json_candidate() {
        assert_eq!(
            extract_json_candidate(r#"noise {"a": "}{", "b": [1, 2]} trailing"#),
            Some(r#"{"a": "}{", "b": [1, 2]}"#)
        );
        assert_eq!(
            extract_json_candidate(r#"x [1, {"q": "\"]"}] y"#),
            Some(r#"[1, {"q": "\"]"}]"#)
        );
        assert_eq!(extract_json_candidate(r#"{"open": [1, 2"#), Some(r#"{"open": [1, 2"#));
        assert_eq!(extract_json_candidate("no json here"), None);
    }

    #[test]
    fn test_repair_json() {
        let repaired = repair_json(r#"{name: "x", list: [1, 2,], }"#);
        let value: Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["name"], "x");
        assert_eq!(value["list"][1], 2);

        let repaired = repair_json(r#"{"url": "http://example.com", "a": [{"b": 1"#);
        let value: Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["url"], "http://example.com");
        assert_eq!(value["a"][0]["b"], 1);
    }
}
