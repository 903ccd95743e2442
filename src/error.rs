use std::fmt;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

/// Why a single chat-completion attempt failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptError {
    #[error("请求超时")]
    Timeout,

    #[error("网络连接失败: {0}")]
    Network(String),

    #[error("API 请求失败: {status} - {message}")]
    HttpStatus { status: u16, message: String },

    #[error("响应体无法解析: {0}")]
    InvalidBody(String),

    #[error("无效的响应格式")]
    EmptyContent,
}

impl AttemptError {
    /// The attempt got a 2xx answer but nothing usable came back.
    pub fn is_malformed(&self) -> bool {
        matches!(self, AttemptError::InvalidBody(_) | AttemptError::EmptyContent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    EmptyInput,
    RequestFailure,
    MalformedResponse,
    ParseFailure,
    InvalidSchedule,
    Validation,
    Config,
    NotFound,
    Unknown,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::EmptyInput => "EMPTY_INPUT",
            ErrorCode::RequestFailure => "REQUEST_FAILURE",
            ErrorCode::MalformedResponse => "MALFORMED_RESPONSE",
            ErrorCode::ParseFailure => "PARSE_FAILURE",
            ErrorCode::InvalidSchedule => "INVALID_SCHEDULE",
            ErrorCode::Validation => "VALIDATION_ERROR",
            ErrorCode::Config => "CONFIG_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    EmptyInput { message: String },

    #[error("AI 请求失败 (共尝试 {attempts} 次): {source}")]
    RequestFailure {
        attempts: u32,
        correlation_id: Option<String>,
        #[source]
        source: AttemptError,
    },

    #[error("AI 响应无效: {message}")]
    MalformedResponse {
        message: String,
        correlation_id: Option<String>,
    },

    #[error("AI 响应解析失败: {message}")]
    ParseFailure {
        message: String,
        details: Option<JsonValue>,
    },

    #[error("时间规划无效: {message}")]
    InvalidSchedule {
        message: String,
        details: Option<JsonValue>,
    },

    #[error("验证失败: {message}")]
    Validation {
        message: String,
        details: Option<JsonValue>,
    },

    #[error("配置错误: {0}")]
    Config(String),

    #[error("资源不存在")]
    NotFound,

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn empty_input(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, "empty input rejected");
        AppError::EmptyInput { message }
    }

    pub fn request_failure(
        attempts: u32,
        correlation_id: Option<&str>,
        source: AttemptError,
    ) -> Self {
        let correlation_id = correlation_id.map(str::to_string);
        warn!(
            target: "app::ai::error",
            code = %ErrorCode::RequestFailure,
            attempts,
            correlation_id = correlation_id.as_deref().unwrap_or("-"),
            error = %source,
            "request attempts exhausted"
        );
        AppError::RequestFailure {
            attempts,
            correlation_id,
            source,
        }
    }

    pub fn malformed_response(message: impl Into<String>, correlation_id: Option<&str>) -> Self {
        let message = message.into();
        let correlation_id = correlation_id.map(str::to_string);
        warn!(
            target: "app::ai::error",
            code = %ErrorCode::MalformedResponse,
            correlation_id = correlation_id.as_deref().unwrap_or("-"),
            %message
        );
        AppError::MalformedResponse {
            message,
            correlation_id,
        }
    }

    pub fn parse_failure(message: impl Into<String>) -> Self {
        Self::parse_failure_with_details(message, None)
    }

    pub fn parse_failure_with_details(
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        let message = message.into();
        match &details {
            Some(payload) => {
                warn!(target: "app::ai::error", code = %ErrorCode::ParseFailure, details = %payload, %message)
            }
            None => warn!(target: "app::ai::error", code = %ErrorCode::ParseFailure, %message),
        }
        AppError::ParseFailure { message, details }
    }

    pub fn invalid_schedule(message: impl Into<String>, details: Option<JsonValue>) -> Self {
        let message = message.into();
        match &details {
            Some(payload) => {
                warn!(target: "app::planner", code = %ErrorCode::InvalidSchedule, details = %payload, %message)
            }
            None => warn!(target: "app::planner", code = %ErrorCode::InvalidSchedule, %message),
        }
        AppError::InvalidSchedule { message, details }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, "validation error");
        AppError::Validation {
            message,
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: JsonValue) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, details = %details, "validation error with details");
        AppError::Validation {
            message,
            details: Some(details),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::config", %message, "configuration error");
        AppError::Config(message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::other", %message, "other error");
        AppError::Other(message)
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::EmptyInput { .. } => ErrorCode::EmptyInput,
            AppError::RequestFailure { .. } => ErrorCode::RequestFailure,
            AppError::MalformedResponse { .. } => ErrorCode::MalformedResponse,
            AppError::ParseFailure { .. } => ErrorCode::ParseFailure,
            AppError::InvalidSchedule { .. } => ErrorCode::InvalidSchedule,
            AppError::Validation { .. } => ErrorCode::Validation,
            AppError::Config(_) => ErrorCode::Config,
            AppError::NotFound => ErrorCode::NotFound,
            AppError::Serialization(_) | AppError::Io(_) | AppError::Other(_) => {
                ErrorCode::Unknown
            }
        }
    }

    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            AppError::RequestFailure { correlation_id, .. }
            | AppError::MalformedResponse { correlation_id, .. } => correlation_id.as_deref(),
            _ => None,
        }
    }

    /// The last attempt's failure when retries were exhausted.
    pub fn last_attempt_error(&self) -> Option<&AttemptError> {
        match self {
            AppError::RequestFailure { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn details(&self) -> Option<&JsonValue> {
        match self {
            AppError::ParseFailure { details, .. }
            | AppError::InvalidSchedule { details, .. }
            | AppError::Validation { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}
