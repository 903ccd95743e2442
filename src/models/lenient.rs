//! Forgiving `serde` readers for fields the language model fills in.
//!
//! The model is asked for numbers but regularly answers with strings such as
//! `"30"` or `"预计用时30分钟"`; these helpers accept both shapes.

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use crate::models::task::Priority;

/// Leading integer in a number or string value, if any.
pub fn loose_integer(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.round() as i64)),
        JsonValue::String(text) => {
            let trimmed = text.trim();
            let (sign, rest) = match trimmed.strip_prefix('-') {
                Some(rest) => (-1, rest.trim_start()),
                None => (1, trimmed),
            };
            let digits: String = rest
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse::<i64>().ok().map(|number| sign * number)
        }
        _ => None,
    }
}

/// Positive minute count; zero, negative and unreadable values become `None`.
pub fn loose_minutes(value: &JsonValue) -> Option<u32> {
    loose_integer(value)
        .filter(|minutes| *minutes > 0)
        .and_then(|minutes| u32::try_from(minutes).ok())
}

pub fn priority<'de, D>(deserializer: D) -> Result<Priority, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .map(Priority::from_loose)
        .unwrap_or_default())
}

pub fn optional_minutes<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(loose_minutes))
}

pub fn string_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = JsonValue::deserialize(deserializer)?;
    match value {
        JsonValue::String(text) => Ok(text),
        JsonValue::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

pub fn loose_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::Bool(flag)) => flag,
        Some(JsonValue::String(text)) => text.trim().eq_ignore_ascii_case("true"),
        Some(JsonValue::Number(number)) => number.as_i64().unwrap_or(0) != 0,
        _ => false,
    })
}
