use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult, AttemptError};
use crate::models::ai::{ChatCompletionRequest, PromptMessage};
use crate::models::settings::AiSettings;
use crate::services::rate_limiter::RateLimiter;
use crate::services::response_normalizer::strip_code_fences;
use crate::utils::clock::{Sleeper, TokioSleeper};
use crate::utils::redact::redact_messages;

/// Sends one conversation to the model and returns the cleaned reply text.
#[async_trait]
pub trait ChatExecutor: Send + Sync {
    async fn execute(&self, messages: &[PromptMessage]) -> AppResult<String>;
}

/// Exponential backoff between attempts of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &AiSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.backoff_base_ms),
            max_delay: Duration::from_millis(settings.backoff_cap_ms),
        }
    }

    /// Wait after the failed zero-based `attempt`: `min(base * 2^attempt, max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// OpenAI-compatible `chat/completions` client shared by every AI operation.
pub struct ChatCompletionClient {
    client: reqwest::Client,
    settings: AiSettings,
    api_key: String,
    endpoint: String,
    limiter: Arc<RateLimiter>,
    sleeper: Arc<dyn Sleeper>,
    retry: RetryPolicy,
}

impl ChatCompletionClient {
    pub fn try_new(settings: &AiSettings, limiter: Arc<RateLimiter>) -> AppResult<Self> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AppError::config("AI API Key 未配置"))?
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|err| AppError::other(format!("初始化 AI HTTP 客户端失败: {err}")))?;

        let endpoint = settings.endpoint();
        info!(
            target: "app::ai::client",
            endpoint = %endpoint,
            model = %settings.model,
            timeout_secs = settings.request_timeout_secs,
            "chat completion client ready"
        );

        Ok(Self {
            client,
            settings: settings.clone(),
            api_key,
            endpoint,
            limiter,
            sleeper: Arc::new(TokioSleeper),
            retry: RetryPolicy::from_settings(settings),
        })
    }

    /// Replace the sleeper used for retry backoff.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn attempt(
        &self,
        body: &ChatCompletionRequest<'_>,
        correlation_id: &str,
    ) -> Result<String, AttemptError> {
        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(attempt_error_from_reqwest)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| body_read_error(status, err.is_timeout(), err.to_string()))?;

        debug!(
            target: "app::ai::client",
            correlation_id,
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            body_chars = text.chars().count(),
            "AI endpoint responded"
        );

        if !status.is_success() {
            return Err(http_status_error(status, &text));
        }

        let payload: JsonValue = serde_json::from_str(&text)
            .map_err(|err| AttemptError::InvalidBody(err.to_string()))?;

        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(JsonValue::as_str)
            .map(strip_code_fences)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(AttemptError::EmptyContent);
        }

        Ok(content)
    }
}

#[async_trait]
impl ChatExecutor for ChatCompletionClient {
    async fn execute(&self, messages: &[PromptMessage]) -> AppResult<String> {
        let correlation_id = Uuid::new_v4().to_string();
        let body = ChatCompletionRequest::new(&self.settings, messages);

        self.limiter.wait_for_next().await;

        debug!(
            target: "app::ai::client",
            correlation_id = %correlation_id,
            messages = %redact_messages(messages),
            "invoking chat completion"
        );

        let mut last_error = AttemptError::EmptyContent;
        for attempt in 0..self.retry.max_attempts {
            if attempt > 0 {
                self.sleeper.sleep(self.retry.delay_for(attempt - 1)).await;
            }

            match self.attempt(&body, &correlation_id).await {
                Ok(content) => {
                    debug!(
                        target: "app::ai::client",
                        correlation_id = %correlation_id,
                        attempt = attempt + 1,
                        content_chars = content.chars().count(),
                        "chat completion succeeded"
                    );
                    return Ok(content);
                }
                Err(error) => {
                    warn!(
                        target: "app::ai::client",
                        correlation_id = %correlation_id,
                        attempt = attempt + 1,
                        max_attempts = self.retry.max_attempts,
                        error = %error,
                        "chat completion attempt failed"
                    );
                    last_error = error;
                }
            }
        }

        if last_error.is_malformed() {
            Err(AppError::malformed_response(
                last_error.to_string(),
                Some(correlation_id.as_str()),
            ))
        } else {
            Err(AppError::request_failure(
                self.retry.max_attempts,
                Some(correlation_id.as_str()),
                last_error,
            ))
        }
    }
}

fn attempt_error_from_reqwest(err: reqwest::Error) -> AttemptError {
    if err.is_timeout() {
        AttemptError::Timeout
    } else if let Some(status) = err.status() {
        AttemptError::HttpStatus {
            status: status.as_u16(),
            message: err.to_string(),
        }
    } else {
        AttemptError::Network(err.to_string())
    }
}

/// The body could not be read. Only a 2xx answer counts as malformed; an error
/// status stays an HTTP failure.
fn body_read_error(status: StatusCode, timed_out: bool, detail: String) -> AttemptError {
    if timed_out {
        AttemptError::Timeout
    } else if status.is_success() {
        AttemptError::InvalidBody(detail)
    } else {
        http_status_error(status, "")
    }
}

/// Non-2xx answer; the provider's `error.message` is used when present.
fn http_status_error(status: StatusCode, body: &str) -> AttemptError {
    let message = serde_json::from_str::<JsonValue>(body)
        .ok()
        .and_then(|payload| {
            payload
                .pointer("/error/message")
                .and_then(JsonValue::as_str)
                .map(str::to_string)
        })
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| "未知错误".to_string());

    AttemptError::HttpStatus {
        status: status.as_u16(),
        message,
    }
}

/// Scripted executors for exercising AI operations without a network.
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays queued replies in order and records every conversation it saw.
    #[derive(Default)]
    pub struct ScriptedExecutor {
        replies: Mutex<VecDeque<AppResult<String>>>,
        seen: Mutex<Vec<Vec<PromptMessage>>>,
    }

    impl ScriptedExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn replying(replies: impl IntoIterator<Item = &'static str>) -> Self {
            let executor = Self::new();
            for reply in replies {
                executor.push_reply(reply);
            }
            executor
        }

        pub fn push_reply(&self, reply: impl Into<String>) {
            self.replies
                .lock()
                .expect("script lock poisoned")
                .push_back(Ok(reply.into()));
        }

        pub fn push_error(&self, error: AppError) {
            self.replies
                .lock()
                .expect("script lock poisoned")
                .push_back(Err(error));
        }

        pub fn calls(&self) -> usize {
            self.seen.lock().expect("script lock poisoned").len()
        }

        pub fn conversations(&self) -> Vec<Vec<PromptMessage>> {
            self.seen.lock().expect("script lock poisoned").clone()
        }
    }

    #[async_trait]
    impl ChatExecutor for ScriptedExecutor {
        async fn execute(&self, messages: &[PromptMessage]) -> AppResult<String> {
            self.seen
                .lock()
                .expect("script lock poisoned")
                .push(messages.to_vec());
            self.replies
                .lock()
                .expect("script lock poisoned")
                .pop_front()
                .unwrap_or_else(|| Err(AppError::other("no scripted reply left")))
        }
    }
}
