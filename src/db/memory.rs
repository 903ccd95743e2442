use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::db::{CurrentUser, JournalStore, TaskStore};
use crate::error::{AppError, AppResult};
use crate::models::journal::{JournalEntry, JournalInsightRecord};
use crate::models::task::{
    NewTodo, TaskStatus, TodoRecord, TodoScheduleUpdate, TodoStatusUpdate, TodoUpdate,
};

#[derive(Debug, Default)]
struct MemoryState {
    user_id: Option<String>,
    tasks: Vec<TodoRecord>,
    journals: Vec<JournalEntry>,
    insights: Vec<JournalInsightRecord>,
}

/// In-process store implementing every collaborator contract.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user_id: impl Into<String>) -> Self {
        let store = Self::new();
        store.sign_in(user_id);
        store
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.user_id = Some(user_id.into());
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.user_id = None;
        }
    }

    pub fn task(&self, id: &str) -> Option<TodoRecord> {
        self.lock()
            .ok()
            .and_then(|state| state.tasks.iter().find(|task| task.id == id).cloned())
    }

    pub fn insight_for(&self, journal_id: &str) -> Option<JournalInsightRecord> {
        self.lock().ok().and_then(|state| {
            state
                .insights
                .iter()
                .find(|record| record.journal_id == journal_id)
                .cloned()
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| AppError::other("内存存储锁已损坏"))
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(&self, task: NewTodo) -> AppResult<TodoRecord> {
        let record = TodoRecord {
            id: Uuid::new_v4().to_string(),
            user_id: task.user_id,
            title: task.title,
            description: task.description,
            due_date: task.due_date,
            priority: task.priority,
            status: task.status,
            estimated_time: task.estimated_time,
            start_time: task.start_time,
            end_time: None,
            ai_suggestions: None,
            subtasks: task.subtasks,
        };

        debug!(target: "app::store", task_id = %record.id, "task created");
        self.lock()?.tasks.push(record.clone());
        Ok(record)
    }

    async fn update_schedule(&self, update: &TodoScheduleUpdate) -> AppResult<()> {
        let mut state = self.lock()?;
        let task = state
            .tasks
            .iter_mut()
            .find(|task| task.id == update.id)
            .ok_or(AppError::NotFound)?;

        task.start_time = Some(update.start_time);
        task.end_time = Some(update.end_time);
        task.estimated_time = Some(update.estimated_time);
        Ok(())
    }

    async fn update_status(&self, update: &TodoStatusUpdate) -> AppResult<()> {
        let mut state = self.lock()?;
        let task = state
            .tasks
            .iter_mut()
            .find(|task| task.id == update.id)
            .ok_or(AppError::NotFound)?;

        task.status = update.status;
        task.start_time = update.start_time;
        task.end_time = update.end_time;
        Ok(())
    }

    async fn update_task(&self, update: &TodoUpdate) -> AppResult<()> {
        let mut state = self.lock()?;
        let task = state
            .tasks
            .iter_mut()
            .find(|task| task.id == update.id)
            .ok_or(AppError::NotFound)?;

        update.apply_to(task);
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> AppResult<()> {
        let mut state = self.lock()?;
        let before = state.tasks.len();
        state.tasks.retain(|task| task.id != id);
        if state.tasks.len() == before {
            return Err(AppError::NotFound);
        }
        debug!(target: "app::store", task_id = %id, "task deleted");
        Ok(())
    }

    async fn list_tasks(
        &self,
        user_id: &str,
        status: Option<TaskStatus>,
    ) -> AppResult<Vec<TodoRecord>> {
        Ok(self
            .lock()?
            .tasks
            .iter()
            .filter(|task| task.user_id == user_id)
            .filter(|task| status.map_or(true, |status| task.status == status))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl JournalStore for MemoryStore {
    async fn upsert_entry(
        &self,
        user_id: &str,
        date: NaiveDate,
        content: String,
    ) -> AppResult<JournalEntry> {
        let mut state = self.lock()?;

        if let Some(entry) = state
            .journals
            .iter_mut()
            .find(|entry| entry.user_id == user_id && entry.date == date)
        {
            entry.content = content;
            return Ok(entry.clone());
        }

        let entry = JournalEntry {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            date,
            content,
        };
        state.journals.push(entry.clone());
        Ok(entry)
    }

    async fn upsert_insight(&self, record: JournalInsightRecord) -> AppResult<()> {
        let mut state = self.lock()?;
        state
            .insights
            .retain(|existing| existing.journal_id != record.journal_id);
        state.insights.push(record);
        Ok(())
    }

    async fn list_entries(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<JournalEntry>> {
        Ok(self
            .lock()?
            .journals
            .iter()
            .filter(|entry| entry.user_id == user_id && entry.date >= from && entry.date <= to)
            .cloned()
            .collect())
    }

    async fn list_insights(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<JournalInsightRecord>> {
        Ok(self
            .lock()?
            .insights
            .iter()
            .filter(|record| {
                record.user_id == user_id && record.date >= from && record.date <= to
            })
            .cloned()
            .collect())
    }
}

impl CurrentUser for MemoryStore {
    fn current_user_id(&self) -> Option<String> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.user_id.clone())
    }
}
