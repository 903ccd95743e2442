use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::settings::AiSettings;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn of a chat-completion conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptMessage {
    pub role: ChatRole,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Body of `POST {base_url}/chat/completions`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [PromptMessage],
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    pub top_p: f32,
}

impl<'a> ChatCompletionRequest<'a> {
    pub fn new(settings: &'a AiSettings, messages: &'a [PromptMessage]) -> Self {
        Self {
            model: &settings.model,
            messages,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            stream: false,
            presence_penalty: settings.presence_penalty,
            frequency_penalty: settings.frequency_penalty,
            top_p: settings.top_p,
        }
    }
}

pub const QUICK_START_FALLBACK: &str = "准备好工具，立即开始行动";
pub const COMPLETION_FALLBACK: &str = "• 专注当前步骤\n• 及时记录进度\n• 确保完成质量";

/// Focus-mode coaching: a one-line starter plus a short bullet list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuickStartSuggestion {
    pub quick_start: String,
    pub completion: String,
}

impl Default for QuickStartSuggestion {
    fn default() -> Self {
        Self {
            quick_start: QUICK_START_FALLBACK.to_string(),
            completion: COMPLETION_FALLBACK.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiSuggestionKind {
    Optimization,
    Scheduling,
    Breakdown,
}

/// Free-form advice attached to a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiTaskSuggestion {
    #[serde(rename = "type")]
    pub kind: AiSuggestionKind,
    pub content: String,
}
