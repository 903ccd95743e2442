pub mod ai_commands;
pub mod settings;
pub mod task;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use tracing::error;

use crate::db::{CurrentUser, JournalStore, TaskStore};
use crate::error::{AppError, AppResult};
use crate::services::ai_service::AiService;
use crate::services::planner_service::PlannerService;
use crate::services::settings_service::SettingsService;

/// Services shared by every command handler.
#[derive(Clone)]
pub struct AppState {
    settings_service: Arc<SettingsService>,
    ai_service: Arc<AiService>,
    planner_service: Arc<PlannerService>,
}

impl AppState {
    /// Wire the HTTP-backed AI service from the loaded settings.
    pub fn new(
        settings_service: Arc<SettingsService>,
        tasks: Arc<dyn TaskStore>,
        journals: Arc<dyn JournalStore>,
        user: Arc<dyn CurrentUser>,
    ) -> AppResult<Self> {
        let ai_settings = settings_service.ai_settings()?;
        let ai_service = Arc::new(AiService::from_settings(&ai_settings)?);
        Ok(Self::from_parts(
            settings_service,
            ai_service,
            tasks,
            journals,
            user,
        ))
    }

    pub fn from_parts(
        settings_service: Arc<SettingsService>,
        ai_service: Arc<AiService>,
        tasks: Arc<dyn TaskStore>,
        journals: Arc<dyn JournalStore>,
        user: Arc<dyn CurrentUser>,
    ) -> Self {
        let planner_service = Arc::new(PlannerService::new(
            Arc::clone(&ai_service),
            tasks,
            journals,
            user,
        ));

        Self {
            settings_service,
            ai_service,
            planner_service,
        }
    }

    pub fn ai(&self) -> Arc<AiService> {
        Arc::clone(&self.ai_service)
    }

    pub fn planner(&self) -> Arc<PlannerService> {
        Arc::clone(&self.planner_service)
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings_service)
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

/// Error payload shown inline next to the control that triggered it.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.details
            .as_ref()
            .and_then(|details| details.get("correlationId"))
            .and_then(JsonValue::as_str)
    }
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        let code = error.code().as_str();
        let mut merged = JsonMap::new();

        match error.details() {
            Some(JsonValue::Object(map)) => merged.extend(map.clone()),
            Some(value) => {
                merged.insert("info".to_string(), value.clone());
            }
            None => {}
        }
        if let Some(id) = error.correlation_id() {
            merged.insert("correlationId".to_string(), json!(id));
        }

        let message = match &error {
            AppError::RequestFailure {
                attempts, source, ..
            } => {
                merged.insert("attempts".to_string(), json!(attempts));
                format!("AI 服务暂时不可用: {source}")
            }
            AppError::EmptyInput { message } => message.clone(),
            AppError::Validation { message, .. } => message.clone(),
            AppError::NotFound => "请求的资源不存在".to_string(),
            AppError::Serialization(_) | AppError::Io(_) | AppError::Other(_) => {
                error!(target: "app::command", error = %error, "internal error in command");
                "内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let details = if merged.is_empty() {
            None
        } else {
            Some(JsonValue::Object(merged))
        };
        CommandError::new(code, message, details)
    }
}
