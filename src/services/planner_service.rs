use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};
use tracing::{debug, info};

use crate::db::{CurrentUser, JournalStore, TaskStore};
use crate::error::{AppError, AppResult};
use crate::models::ai::AiTaskSuggestion;
use crate::models::calendar::CalendarDay;
use crate::models::journal::{JournalInsightRecord, JournalSections};
use crate::models::planning::ScheduleProposal;
use crate::models::settings::UserPreferences;
use crate::models::task::{TaskStatus, TodoRecord, TodoUpdate};
use crate::services::ai_service::AiService;
use crate::services::calendar_service::{build_month_view, month_days};
use crate::services::settings_service::validate_preferences;
use crate::services::task_board::{
    group_by_status, new_todo_from_draft, new_todo_on_day, normalized_edit, quick_add_draft,
    sort_for_board, status_transition, toggled_status, BoardColumns,
};

/// The AI features wired to the user's stores, the way the screens use them.
///
/// Store writes are never retried; only the chat call underneath is.
pub struct PlannerService {
    ai: Arc<AiService>,
    tasks: Arc<dyn TaskStore>,
    journals: Arc<dyn JournalStore>,
    user: Arc<dyn CurrentUser>,
}

impl PlannerService {
    pub fn new(
        ai: Arc<AiService>,
        tasks: Arc<dyn TaskStore>,
        journals: Arc<dyn JournalStore>,
        user: Arc<dyn CurrentUser>,
    ) -> Self {
        Self {
            ai,
            tasks,
            journals,
            user,
        }
    }

    pub fn ai(&self) -> Arc<AiService> {
        Arc::clone(&self.ai)
    }

    fn require_user(&self) -> AppResult<String> {
        self.user
            .current_user_id()
            .ok_or_else(|| AppError::validation("未登录"))
    }

    /// Split free text and put every draft on the board as started.
    pub async fn split_and_create(&self, content: &str) -> AppResult<Vec<TodoRecord>> {
        let user_id = self.require_user()?;
        let drafts = self.ai.split_tasks(content).await?;
        if drafts.is_empty() {
            return Err(AppError::validation("未能正确拆分任务"));
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(drafts.len());
        for draft in &drafts {
            let record = self
                .tasks
                .create_task(new_todo_from_draft(&user_id, draft, now))
                .await?;
            created.push(record);
        }

        info!(target: "app::planner", count = created.len(), "split tasks created");
        Ok(created)
    }

    /// Single task from the quick-add box; blank input adds nothing.
    pub async fn quick_add(&self, input: &str) -> AppResult<Option<TodoRecord>> {
        let user_id = self.require_user()?;
        let Some(draft) = quick_add_draft(input) else {
            return Ok(None);
        };

        let record = self
            .tasks
            .create_task(new_todo_from_draft(&user_id, &draft, Utc::now()))
            .await?;
        Ok(Some(record))
    }

    pub async fn board(&self) -> AppResult<BoardColumns> {
        let user_id = self.require_user()?;
        let mut tasks = self.tasks.list_tasks(&user_id, None).await?;
        sort_for_board(&mut tasks);
        Ok(group_by_status(&tasks))
    }

    /// Pending task added from a calendar cell; blank titles add nothing.
    pub async fn add_on_day(&self, day: NaiveDate, title: &str) -> AppResult<Option<TodoRecord>> {
        let user_id = self.require_user()?;
        let Some(todo) = new_todo_on_day(&user_id, title, day) else {
            return Ok(None);
        };
        Ok(Some(self.tasks.create_task(todo).await?))
    }

    async fn find_task(&self, user_id: &str, task_id: &str) -> AppResult<TodoRecord> {
        self.tasks
            .list_tasks(user_id, None)
            .await?
            .into_iter()
            .find(|task| task.id == task_id)
            .ok_or(AppError::NotFound)
    }

    pub async fn change_status(&self, task_id: &str, status: TaskStatus) -> AppResult<TodoRecord> {
        let user_id = self.require_user()?;
        let task = self.find_task(&user_id, task_id).await?;
        self.apply_status(task, status).await
    }

    /// Checkbox click: completed goes back to pending, anything else completes.
    pub async fn toggle_status(&self, task_id: &str) -> AppResult<TodoRecord> {
        let user_id = self.require_user()?;
        let task = self.find_task(&user_id, task_id).await?;
        let status = toggled_status(task.status);
        self.apply_status(task, status).await
    }

    async fn apply_status(&self, task: TodoRecord, status: TaskStatus) -> AppResult<TodoRecord> {
        let update = status_transition(&task, status, Utc::now());
        self.tasks.update_status(&update).await?;

        Ok(TodoRecord {
            status: update.status,
            start_time: update.start_time,
            end_time: update.end_time,
            ..task
        })
    }

    /// Title, estimate, due date and times of one of the user's tasks.
    pub async fn edit_task(&self, edit: &TodoUpdate) -> AppResult<TodoRecord> {
        let user_id = self.require_user()?;
        let mut task = self.find_task(&user_id, &edit.id).await?;
        let update = normalized_edit(&task, edit)?;

        self.tasks.update_task(&update).await?;
        update.apply_to(&mut task);
        debug!(target: "app::planner", task_id = %task.id, "task edited");
        Ok(task)
    }

    pub async fn delete_task(&self, task_id: &str) -> AppResult<()> {
        let user_id = self.require_user()?;
        let task = self.find_task(&user_id, task_id).await?;
        self.tasks.delete_task(&task.id).await?;
        info!(target: "app::planner", task_id = %task.id, "task deleted");
        Ok(())
    }

    pub async fn plan_in_progress(&self, preferences: &UserPreferences) -> AppResult<ScheduleProposal> {
        self.plan_in_progress_at(preferences, Local::now().into())
            .await
    }

    /// Schedule every in-progress task. The proposal is validated in full
    /// before the first write.
    pub async fn plan_in_progress_at(
        &self,
        preferences: &UserPreferences,
        now: DateTime<FixedOffset>,
    ) -> AppResult<ScheduleProposal> {
        let user_id = self.require_user()?;
        validate_preferences(preferences)?;

        let tasks = self
            .tasks
            .list_tasks(&user_id, Some(TaskStatus::InProgress))
            .await?;
        if tasks.is_empty() {
            return Err(AppError::validation("没有进行中的任务需要规划"));
        }

        let proposal = self.ai.plan_tasks_at(&tasks, preferences, now).await?;
        for scheduled in &proposal.tasks {
            self.tasks.update_schedule(&scheduled.to_update()).await?;
        }

        info!(
            target: "app::planner",
            scheduled = proposal.tasks.len(),
            "schedule applied"
        );
        Ok(proposal)
    }

    pub async fn schedule_advice(
        &self,
        preferences: &UserPreferences,
    ) -> AppResult<Vec<AiTaskSuggestion>> {
        let user_id = self.require_user()?;
        let tasks = self
            .tasks
            .list_tasks(&user_id, Some(TaskStatus::Pending))
            .await?;
        self.ai.suggest_schedule_optimization(&tasks, preferences).await
    }

    /// Save the day's journal, analyse it and store the insight next to it.
    pub async fn analyze_and_save_journal(
        &self,
        date: NaiveDate,
        sections: &JournalSections,
    ) -> AppResult<JournalInsightRecord> {
        let user_id = self.require_user()?;
        if sections.is_blank() {
            return Err(AppError::empty_input("日记内容不能为空"));
        }

        let entry = self
            .journals
            .upsert_entry(&user_id, date, sections.to_stored())
            .await?;
        debug!(target: "app::journal", journal_id = %entry.id, %date, "journal saved");

        let insight = self.ai.analyze_journal(&sections.analysis_input()).await?;
        let record = insight.into_record(entry.id, user_id, date);
        self.journals.upsert_insight(record.clone()).await?;

        Ok(record)
    }

    pub async fn month_view(&self, anchor: NaiveDate) -> AppResult<Vec<CalendarDay>> {
        let user_id = self.require_user()?;
        let days = month_days(anchor)?;
        let (Some(first), Some(last)) = (days.first().copied(), days.last().copied()) else {
            return Ok(Vec::new());
        };

        let tasks = self.tasks.list_tasks(&user_id, None).await?;
        let journals = self.journals.list_entries(&user_id, first, last).await?;
        let insights = self.journals.list_insights(&user_id, first, last).await?;

        build_month_view(anchor, &tasks, &journals, &insights)
    }
}
