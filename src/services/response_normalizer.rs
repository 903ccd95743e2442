use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::error::{AppError, AppResult};

static LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*```(?:json)?[ \t]*\r?\n?").expect("valid fence regex"));
static TRAILING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r?\n?[ \t]*```\s*$").expect("valid fence regex"));
static CONTROL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x{0000}-\x{001F}\x{007F}-\x{009F}]").expect("valid control regex"));

/// Remove a leading ```` ```json ```` fence and a trailing ```` ``` ```` fence,
/// then trim. Text without fences only gets trimmed.
pub fn strip_code_fences(raw: &str) -> String {
    let without_leading = LEADING_FENCE.replace(raw, "");
    let without_trailing = TRAILING_FENCE.replace(&without_leading, "");
    without_trailing.trim().to_string()
}

/// Drop C0 and C1 control characters, including raw newlines and tabs.
pub fn strip_control_chars(raw: &str) -> String {
    CONTROL_CHARS.replace_all(raw, "").into_owned()
}

/// Strict JSON parse of a normalized reply.
pub fn parse_json<T: DeserializeOwned>(text: &str, operation: &str) -> AppResult<T> {
    serde_json::from_str(text).map_err(|err| {
        debug!(
            target: "app::ai",
            operation,
            response_chars = text.chars().count(),
            "model reply is not valid JSON"
        );
        AppError::parse_failure_with_details(
            format!("响应内容不是有效的 JSON: {err}"),
            Some(json!({ "operation": operation, "reason": "invalid_json" })),
        )
    })
}
