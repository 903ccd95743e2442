use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::calendar::CalendarDay;
use crate::models::task::{TaskStatus, TodoRecord, TodoUpdate};
use crate::services::task_board::BoardColumns;

use super::{AppState, CommandError, CommandResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardResponse {
    pub pending: Vec<TodoRecord>,
    pub in_progress: Vec<TodoRecord>,
    pub completed: Vec<TodoRecord>,
}

impl From<BoardColumns> for BoardResponse {
    fn from(columns: BoardColumns) -> Self {
        Self {
            pending: columns.pending,
            in_progress: columns.in_progress,
            completed: columns.completed,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangePayload {
    pub task_id: String,
    pub status: TaskStatus,
}

/// Fields left out of the payload keep their stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEditPayload {
    pub task_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub estimated_time: Option<u32>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl From<TaskEditPayload> for TodoUpdate {
    fn from(payload: TaskEditPayload) -> Self {
        Self {
            id: payload.task_id,
            title: payload.title,
            description: payload.description,
            estimated_time: payload.estimated_time,
            due_date: payload.due_date,
            start_time: payload.start_time,
            end_time: payload.end_time,
        }
    }
}

pub async fn tasks_board(app_state: &AppState) -> CommandResult<BoardResponse> {
    let columns = app_state.planner().board().await?;
    Ok(columns.into())
}

pub async fn tasks_quick_add(
    app_state: &AppState,
    input: String,
) -> CommandResult<Option<TodoRecord>> {
    app_state
        .planner()
        .quick_add(&input)
        .await
        .map_err(CommandError::from)
}

pub async fn tasks_set_status(
    app_state: &AppState,
    payload: StatusChangePayload,
) -> CommandResult<TodoRecord> {
    app_state
        .planner()
        .change_status(&payload.task_id, payload.status)
        .await
        .map_err(CommandError::from)
}

pub async fn tasks_toggle(app_state: &AppState, task_id: String) -> CommandResult<TodoRecord> {
    app_state
        .planner()
        .toggle_status(&task_id)
        .await
        .map_err(CommandError::from)
}

pub async fn tasks_edit(
    app_state: &AppState,
    payload: TaskEditPayload,
) -> CommandResult<TodoRecord> {
    app_state
        .planner()
        .edit_task(&payload.into())
        .await
        .map_err(CommandError::from)
}

pub async fn tasks_delete(app_state: &AppState, task_id: String) -> CommandResult<()> {
    app_state
        .planner()
        .delete_task(&task_id)
        .await
        .map_err(CommandError::from)
}

pub async fn calendar_add_task(
    app_state: &AppState,
    day: NaiveDate,
    title: String,
) -> CommandResult<Option<TodoRecord>> {
    app_state
        .planner()
        .add_on_day(day, &title)
        .await
        .map_err(CommandError::from)
}

pub async fn calendar_month(
    app_state: &AppState,
    anchor: NaiveDate,
) -> CommandResult<Vec<CalendarDay>> {
    app_state
        .planner()
        .month_view(anchor)
        .await
        .map_err(CommandError::from)
}
