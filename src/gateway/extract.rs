//! Answer extraction from flow-service responses
//!
//! The flow service is versioned independently of us and its response shape
//! drifts. The common case is
//! `outputs[0].outputs[0].results.message.text`; everything else is found by
//! walking the whole document for known text-bearing fields.

use serde_json::Value;

use super::executor::ResponseBody;

/// Shown when a response parsed fine but held nothing we could display
pub const NO_ANSWER_PLACEHOLDER: &str =
    "Sorry, I could not read a response from the travel assistant.";

/// Extract display text from a response body. Never returns an empty string.
pub fn extract_text(body: &ResponseBody) -> String {
    match body {
        ResponseBody::Json(value) => extract_json(value).unwrap_or_else(placeholder),
        // Already known not to parse as JSON; pass the text through
        ResponseBody::Text(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                placeholder()
            } else {
                trimmed.to_string()
            }
        }
    }
}

fn placeholder() -> String {
    NO_ANSWER_PLACEHOLDER.to_string()
}

/// Known shapes first, then the full walk
fn extract_json(value: &Value) -> Option<String> {
    if let Some(text) = primary_shape(value) {
        return Some(text);
    }

    let mut collector = TextCollector::default();
    collector.visit(value);
    collector.finish()
}

fn first_flow_output(value: &Value) -> Option<&Value> {
    value
        .get("outputs")?
        .as_array()?
        .first()?
        .get("outputs")?
        .as_array()?
        .first()
}

/// `outputs[0].outputs[0].results.message.text`, then the older
/// `outputs[0].outputs[0].artifacts.message` string
fn primary_shape(value: &Value) -> Option<String> {
    let output = first_flow_output(value)?;

    let from_results = output
        .pointer("/results/message/text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let from_artifacts = || {
        output
            .pointer("/artifacts/message")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    from_results.or_else(from_artifacts).map(String::from)
}

/// Depth-first visitor that gathers text fragments in document order
#[derive(Debug, Default)]
struct TextCollector {
    fragments: Vec<String>,
}

impl TextCollector {
    fn visit(&mut self, value: &Value) {
        match value {
            Value::Object(map) => {
                if let Some(results) = map.get("results") {
                    for pointer in ["/message/text", "/message/content", "/text"] {
                        if let Some(text) = results.pointer(pointer).and_then(Value::as_str) {
                            self.push(text);
                        }
                    }
                }
                if let Some(text) = map.get("text").and_then(Value::as_str) {
                    self.push(text);
                }
                for child in map.values() {
                    self.visit(child);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.visit(item);
                }
            }
            Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null => {}
        }
    }

    fn push(&mut self, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() || self.fragments.iter().any(|f| f == trimmed) {
            return;
        }
        self.fragments.push(trimmed.to_string());
    }

    fn finish(self) -> Option<String> {
        if self.fragments.is_empty() {
            None
        } else {
            Some(self.fragments.join("\n\n"))
        }
    }
}
