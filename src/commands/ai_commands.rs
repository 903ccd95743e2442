use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::models::ai::{AiTaskSuggestion, QuickStartSuggestion};
use crate::models::journal::{JournalInsightRecord, JournalSections};
use crate::models::planning::ScheduleProposal;
use crate::models::task::{TaskDraft, TodoRecord};

use super::{AppState, CommandError, CommandResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitTasksRequest {
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalAnalysisRequest {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub sections: JournalSections,
}

/// Log the outcome of a command and convert its error for the UI.
fn finish<T>(command: &'static str, result: AppResult<T>) -> CommandResult<T> {
    match result {
        Ok(value) => {
            debug!(target: "app::command", command, "command completed");
            Ok(value)
        }
        Err(error) => {
            warn!(
                target: "app::command",
                command,
                code = %error.code(),
                correlation_id = error.correlation_id().unwrap_or("-"),
                error = %error,
                "command failed"
            );
            Err(CommandError::from(error))
        }
    }
}

pub async fn ai_split_tasks(
    app_state: &AppState,
    request: SplitTasksRequest,
) -> CommandResult<Vec<TodoRecord>> {
    debug!(
        target: "app::command",
        content_chars = request.content.chars().count(),
        "ai_split_tasks invoked"
    );
    let result = app_state.planner().split_and_create(&request.content).await;
    finish("ai_split_tasks", result)
}

pub async fn ai_plan_tasks(app_state: &AppState) -> CommandResult<ScheduleProposal> {
    debug!(target: "app::command", "ai_plan_tasks invoked");
    let result = match app_state.settings().preferences() {
        Ok(preferences) => app_state.planner().plan_in_progress(&preferences).await,
        Err(error) => Err(error),
    };
    finish("ai_plan_tasks", result)
}

pub async fn ai_quick_start(
    app_state: &AppState,
    task: TodoRecord,
) -> CommandResult<QuickStartSuggestion> {
    debug!(target: "app::command", task_id = %task.id, "ai_quick_start invoked");
    let result = app_state.ai().generate_quick_start_suggestion(&task).await;
    finish("ai_quick_start", result)
}

pub async fn ai_analyze_journal(
    app_state: &AppState,
    request: JournalAnalysisRequest,
) -> CommandResult<JournalInsightRecord> {
    debug!(target: "app::command", date = %request.date, "ai_analyze_journal invoked");
    let result = app_state
        .planner()
        .analyze_and_save_journal(request.date, &request.sections)
        .await;
    finish("ai_analyze_journal", result)
}

/// Positional insight for screens that still index into the result.
pub async fn ai_analyze_journal_flat(
    app_state: &AppState,
    content: String,
) -> CommandResult<Vec<String>> {
    debug!(target: "app::command", "ai_analyze_journal_flat invoked");
    let result = app_state.ai().analyze_journal_flat(&content).await;
    finish("ai_analyze_journal_flat", result)
}

pub async fn ai_refine_tasks(
    app_state: &AppState,
    drafts: Vec<TaskDraft>,
) -> CommandResult<Vec<TaskDraft>> {
    debug!(target: "app::command", count = drafts.len(), "ai_refine_tasks invoked");
    let result = app_state.ai().refine_tasks(&drafts).await;
    finish("ai_refine_tasks", result)
}

pub async fn ai_schedule_advice(app_state: &AppState) -> CommandResult<Vec<AiTaskSuggestion>> {
    debug!(target: "app::command", "ai_schedule_advice invoked");
    let result = match app_state.settings().preferences() {
        Ok(preferences) => app_state.planner().schedule_advice(&preferences).await,
        Err(error) => Err(error),
    };
    finish("ai_schedule_advice", result)
}
