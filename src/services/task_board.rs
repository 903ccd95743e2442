//! Client-side shaping of the task list: quick add, board order, status
//! columns and the suggestion history shown in focus mode.

use std::cmp::Ordering;
use std::collections::VecDeque;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::task::{
    NewTodo, Priority, TaskDraft, TaskStatus, TodoRecord, TodoStatusUpdate, TodoUpdate,
};
use crate::services::schedule_utils::parse_calendar_date;

pub const QUICK_ADD_ESTIMATE_MINUTES: u32 = 30;
pub const SUGGESTION_HISTORY_LIMIT: usize = 5;

/// Draft for a single line typed into the quick-add box.
pub fn quick_add_draft(input: &str) -> Option<TaskDraft> {
    let title = input.trim();
    if title.is_empty() {
        return None;
    }

    Some(TaskDraft {
        priority: Priority::Medium,
        estimated_time_minutes: Some(QUICK_ADD_ESTIMATE_MINUTES),
        ..TaskDraft::new(title)
    })
}

/// Drafts land on the board already started.
pub fn new_todo_from_draft(user_id: &str, draft: &TaskDraft, now: DateTime<Utc>) -> NewTodo {
    NewTodo {
        user_id: user_id.to_string(),
        title: draft.title.clone(),
        description: draft.description.clone(),
        due_date: None,
        priority: draft.priority,
        status: TaskStatus::InProgress,
        estimated_time: draft.estimated_time_minutes,
        start_time: Some(now),
        subtasks: draft.subtasks.clone(),
    }
}

/// Pending task pinned to a calendar day.
pub fn new_todo_on_day(user_id: &str, title: &str, day: NaiveDate) -> Option<NewTodo> {
    let title = title.trim();
    if title.is_empty() {
        return None;
    }

    Some(NewTodo {
        user_id: user_id.to_string(),
        title: title.to_string(),
        description: None,
        due_date: Some(day.format("%Y-%m-%d").to_string()),
        priority: Priority::Medium,
        status: TaskStatus::Pending,
        estimated_time: None,
        start_time: None,
        subtasks: None,
    })
}

/// Trimmed copy of an edit, checked against the task it applies to. Blank
/// description or due date clears nothing; they are dropped from the edit.
pub fn normalized_edit(task: &TodoRecord, edit: &TodoUpdate) -> AppResult<TodoUpdate> {
    let title = match edit.title.as_deref().map(str::trim) {
        Some("") => {
            return Err(AppError::validation_with_details(
                "任务标题不能为空",
                json!({ "field": "title" }),
            ))
        }
        other => other.map(str::to_string),
    };

    if edit.estimated_time == Some(0) {
        return Err(AppError::validation_with_details(
            "预计用时必须大于 0",
            json!({ "field": "estimated_time" }),
        ));
    }

    let due_date = match edit.due_date.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let day = parse_calendar_date(raw).ok_or_else(|| {
                AppError::validation_with_details(
                    format!("无法识别的截止日期: {raw}"),
                    json!({ "field": "due_date" }),
                )
            })?;
            Some(day.format("%Y-%m-%d").to_string())
        }
    };

    let normalized = TodoUpdate {
        id: task.id.clone(),
        title,
        description: edit
            .description
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string),
        estimated_time: edit.estimated_time,
        due_date,
        start_time: edit.start_time,
        end_time: edit.end_time,
    };

    let start = normalized.start_time.or(task.start_time);
    let end = normalized.end_time.or(task.end_time);
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(AppError::validation_with_details(
                "结束时间不能早于开始时间",
                json!({ "field": "end_time" }),
            ));
        }
    }

    Ok(normalized)
}

/// Priority first, then due date; tasks without a due date sort last.
pub fn sort_for_board(tasks: &mut [TodoRecord]) {
    tasks.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| compare_due(a.due_date.as_deref(), b.due_date.as_deref()))
    });
}

fn compare_due(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a.and_then(parse_calendar_date), b.and_then(parse_calendar_date)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardColumns {
    pub pending: Vec<TodoRecord>,
    pub in_progress: Vec<TodoRecord>,
    pub completed: Vec<TodoRecord>,
}

impl BoardColumns {
    pub fn column(&self, status: TaskStatus) -> &[TodoRecord] {
        match status {
            TaskStatus::Pending => &self.pending,
            TaskStatus::InProgress => &self.in_progress,
            TaskStatus::Completed => &self.completed,
        }
    }
}

/// Split an already ordered list into its status columns.
pub fn group_by_status(tasks: &[TodoRecord]) -> BoardColumns {
    let mut columns = BoardColumns::default();
    for task in tasks {
        let column = match task.status {
            TaskStatus::Pending => &mut columns.pending,
            TaskStatus::InProgress => &mut columns.in_progress,
            TaskStatus::Completed => &mut columns.completed,
        };
        column.push(task.clone());
    }
    columns
}

/// Entering `in_progress` restamps the start; entering `completed` stamps the
/// end. Other timestamps are carried over.
pub fn status_transition(
    task: &TodoRecord,
    status: TaskStatus,
    now: DateTime<Utc>,
) -> TodoStatusUpdate {
    TodoStatusUpdate {
        id: task.id.clone(),
        status,
        start_time: if status == TaskStatus::InProgress {
            Some(now)
        } else {
            task.start_time
        },
        end_time: if status == TaskStatus::Completed {
            Some(now)
        } else {
            task.end_time
        },
    }
}

/// Target of the checkbox next to a task.
pub fn toggled_status(current: TaskStatus) -> TaskStatus {
    match current {
        TaskStatus::Completed => TaskStatus::Pending,
        _ => TaskStatus::Completed,
    }
}

/// Most recent suggestions, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionHistory {
    entries: VecDeque<String>,
}

impl SuggestionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, suggestion: impl Into<String>) {
        self.entries.push_front(suggestion.into());
        self.entries.truncate(SUGGESTION_HISTORY_LIMIT);
    }

    pub fn latest(&self) -> Option<&str> {
        self.entries.front().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
