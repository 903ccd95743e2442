//! Contracts of the hosted data store the AI layer hands its records to.
//!
//! The production backend lives outside this crate; [`memory::MemoryStore`]
//! backs tests and offline use.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::AppResult;
use crate::models::journal::{JournalEntry, JournalInsightRecord};
use crate::models::task::{
    NewTodo, TaskStatus, TodoRecord, TodoScheduleUpdate, TodoStatusUpdate, TodoUpdate,
};

pub mod memory;

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, task: NewTodo) -> AppResult<TodoRecord>;

    async fn update_schedule(&self, update: &TodoScheduleUpdate) -> AppResult<()>;

    async fn update_status(&self, update: &TodoStatusUpdate) -> AppResult<()>;

    /// Overwrites only the fields set on `update`.
    async fn update_task(&self, update: &TodoUpdate) -> AppResult<()>;
    async fn delete_task(&self, id: &str) -> AppResult<()>;

    /// Tasks of `user_id`, optionally narrowed to one status.
    async fn list_tasks(
        &self,
        user_id: &str,
        status: Option<TaskStatus>,
    ) -> AppResult<Vec<TodoRecord>>;
}

#[async_trait]
pub trait JournalStore: Send + Sync {
    /// Create the user's entry for `date` or replace its content.
    async fn upsert_entry(
        &self,
        user_id: &str,
        date: NaiveDate,
        content: String,
    ) -> AppResult<JournalEntry>;

    /// One insight per journal; a newer analysis replaces the old one.
    async fn upsert_insight(&self, record: JournalInsightRecord) -> AppResult<()>;

    async fn list_entries(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<JournalEntry>>;

    async fn list_insights(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<JournalInsightRecord>>;
}

/// Authenticated-user accessor.
pub trait CurrentUser: Send + Sync {
    fn current_user_id(&self) -> Option<String>;
}
