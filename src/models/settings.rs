use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.siliconflow.cn/v1";
pub const DEFAULT_MODEL: &str = "deepseek-ai/DeepSeek-R1-Distill-Qwen-1.5B";

/// Chat-completion provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AiSettings {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    pub min_request_interval_ms: u64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 2048,
            top_p: 0.95,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            request_timeout_secs: 60,
            max_attempts: 5,
            backoff_base_ms: 1000,
            backoff_cap_ms: 10_000,
            min_request_interval_ms: 1000,
        }
    }
}

impl AiSettings {
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Daily rhythm the planner works around.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UserPreferences {
    pub wake_time: String,
    pub sleep_time: String,
    pub focus_duration: u32,
    pub break_duration: u32,
    pub daily_focus_goal: u32,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            wake_time: "07:00".to_string(),
            sleep_time: "23:00".to_string(),
            focus_duration: 25,
            break_duration: 5,
            daily_focus_goal: 240,
        }
    }
}
