//! Recovers a JSON value from whatever the extraction service sent back.
//!
//! Language models are not bound to return clean JSON, so the text goes
//! through an ordered list of purely syntactic strategies. The first one
//! that yields valid JSON wins; nothing here guesses at content.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::ChartError;

static FENCE_OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*```(?:json)?\s*").unwrap());
static FENCE_CLOSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```\s*$").unwrap());
static EMBEDDED_OBJECT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Which heuristic produced the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The payload was already structured data.
    Structured,
    Direct,
    Fenced,
    Embedded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub value: Value,
    pub strategy: Strategy,
}

enum WorkingText<'a> {
    Structured(&'a Value),
    Text(&'a str),
}

fn working_text(payload: &Value) -> WorkingText<'_> {
    match payload {
        Value::String(text) => WorkingText::Text(text),
        Value::Object(obj) => match obj.get("response") {
            Some(Value::String(text)) => WorkingText::Text(text),
            Some(inner @ Value::Object(_)) => WorkingText::Structured(inner),
            _ => WorkingText::Structured(payload),
        },
        _ => WorkingText::Structured(payload),
    }
}

pub fn normalize_response(payload: &Value) -> Result<Normalized, ChartError> {
    match working_text(payload) {
        WorkingText::Structured(value) => {
            debug!(strategy = ?Strategy::Structured, "extraction payload already structured");
            Ok(Normalized {
                value: value.clone(),
                strategy: Strategy::Structured,
            })
        }
        WorkingText::Text(text) => normalize_text(text),
    }
}

pub fn normalize_text(text: &str) -> Result<Normalized, ChartError> {
    let strategies: [(Strategy, fn(&str) -> Option<Value>); 3] = [
        (Strategy::Direct, parse_direct),
        (Strategy::Fenced, parse_fenced),
        (Strategy::Embedded, parse_embedded),
    ];
    for (strategy, attempt) in strategies {
        if let Some(value) = attempt(text) {
            debug!(?strategy, "recovered JSON from extraction text");
            return Ok(Normalized { value, strategy });
        }
    }
    Err(ChartError::MalformedResponse {
        raw: text.to_string(),
    })
}

pub fn parse_direct(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

/// Strips a leading ```` ```json ```` marker and a trailing ```` ``` ````.
pub fn parse_fenced(text: &str) -> Option<Value> {
    if !FENCE_OPEN_RE.is_match(text) && !FENCE_CLOSE_RE.is_match(text) {
        return None;
    }
    let opened = FENCE_OPEN_RE.replace(text, "");
    let stripped = FENCE_CLOSE_RE.replace(&opened, "");
    serde_json::from_str(&stripped).ok()
}

/// Greedy first-`{` to last-`}` match.
pub fn parse_embedded(text: &str) -> Option<Value> {
    let found = EMBEDDED_OBJECT_RE.find(text)?;
    serde_json::from_str(found.as_str()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn samples() -> Vec<Value> {
        vec![
            json!({"title": "Bugs", "data": [{"label": "Open", "value": 30}]}),
            json!([1, 2.5, "three", null]),
            json!("plain string"),
            json!(42),
            json!({"nested": {"deep": [true, false, {"x": "}{"}]}}),
        ]
    }

    #[test]
    fn stringified_values_round_trip() {
        for value in samples() {
            let text = serde_json::to_string(&value).unwrap();
            let normalized = normalize_text(&text).unwrap();
            assert_eq!(normalized.value, value);
            assert_eq!(normalized.strategy, Strategy::Direct);
        }
    }

    #[test]
    fn fenced_values_round_trip() {
        for value in samples() {
            let text = format!("```json\n{}\n```", serde_json::to_string(&value).unwrap());
            let normalized = normalize_text(&text).unwrap();
            assert_eq!(normalized.value, value);
            assert_eq!(normalized.strategy, Strategy::Fenced);
        }
    }

    #[test]
    fn fence_tolerates_whitespace_and_missing_tag() {
        let text = "  \n```\n{\"a\": 1}\n```  \n";
        assert_eq!(parse_fenced(text), Some(json!({"a": 1})));
        let text = "```JSON {\"a\": 2}```";
        assert_eq!(parse_fenced(text), Some(json!({"a": 2})));
    }

    #[test]
    fn embedded_object_in_prose() {
        let text = "Sure! Here is your chart:\n{\"title\": \"T\", \"data\": []}\nLet me know.";
        let normalized = normalize_text(text).unwrap();
        assert_eq!(normalized.strategy, Strategy::Embedded);
        assert_eq!(normalized.value, json!({"title": "T", "data": []}));
    }

    #[test]
    fn fenced_block_inside_prose_falls_through_to_embedded() {
        let text = "Here you go:\n```json\n{\"title\": \"T\"}\n```\nDone.";
        let normalized = normalize_text(text).unwrap();
        assert_eq!(normalized.strategy, Strategy::Embedded);
        assert_eq!(normalized.value["title"], "T");
    }

    #[test]
    fn envelope_with_response_string_is_unwrapped() {
        let payload = json!({"response": "```json\n{\"title\": \"Env\"}\n```"});
        let normalized = normalize_response(&payload).unwrap();
        assert_eq!(normalized.value, json!({"title": "Env"}));
        assert_eq!(normalized.strategy, Strategy::Fenced);
    }

    #[test]
    fn envelope_with_response_object_is_taken_as_is() {
        let payload = json!({"response": {"title": "Inner"}});
        let normalized = normalize_response(&payload).unwrap();
        assert_eq!(normalized.value, json!({"title": "Inner"}));
        assert_eq!(normalized.strategy, Strategy::Structured);
    }

    #[test]
    fn structured_payload_passes_through() {
        let payload = json!({"title": "Direct", "data": []});
        let normalized = normalize_response(&payload).unwrap();
        assert_eq!(normalized.value, payload);
        assert_eq!(normalized.strategy, Strategy::Structured);
    }

    #[test]
    fn hopeless_text_keeps_raw_for_diagnostics() {
        let text = "I could not build that chart, sorry {not json}";
        match normalize_text(text) {
            Err(ChartError::MalformedResponse { raw }) => assert_eq!(raw, text),
            other => panic!("expected malformed response, got {other:?}"),
        }
    }
}
