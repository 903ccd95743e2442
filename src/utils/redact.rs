use serde_json::{json, Value as JsonValue};

use crate::models::ai::PromptMessage;

const REDACTED: &str = "[REDACTED]";

/// Log-safe view of a conversation: roles and sizes only.
///
/// Task lists and journal text are personal, so prompt bodies never reach the
/// log files.
pub fn redact_messages(messages: &[PromptMessage]) -> JsonValue {
    let entries: Vec<JsonValue> = messages
        .iter()
        .map(|message| {
            json!({
                "role": message.role.as_str(),
                "chars": message.content.chars().count(),
            })
        })
        .collect();
    JsonValue::Array(entries)
}

/// Mask free-text fields in a model payload before it is attached to a log line.
pub fn redact_sensitive_data(data: &JsonValue) -> JsonValue {
    match data {
        JsonValue::Object(map) => {
            let mut redacted = serde_json::Map::new();
            for (key, value) in map {
                let masked = if is_sensitive_field(key) {
                    mask_string(value)
                } else {
                    redact_sensitive_data(value)
                };
                redacted.insert(key.clone(), masked);
            }
            JsonValue::Object(redacted)
        }
        JsonValue::Array(items) => {
            JsonValue::Array(items.iter().map(redact_sensitive_data).collect())
        }
        _ => data.clone(),
    }
}

fn is_sensitive_field(field_name: &str) -> bool {
    let lower = field_name.to_lowercase();
    matches!(
        lower.as_str(),
        "title"
            | "description"
            | "content"
            | "suggestion"
            | "planninglogic"
            | "planning_logic"
            | "quickstart"
            | "completion"
    )
}

fn mask_string(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::String(s) if !s.is_empty() => JsonValue::String(REDACTED.to_string()),
        _ => value.clone(),
    }
}
