use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local, Utc};
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::ai::{
    AiSuggestionKind, AiTaskSuggestion, QuickStartSuggestion, COMPLETION_FALLBACK,
    QUICK_START_FALLBACK,
};
use crate::models::journal::JournalInsight;
use crate::models::lenient::loose_minutes;
use crate::models::planning::{ScheduleProposal, ScheduledTask};
use crate::models::settings::{AiSettings, UserPreferences};
use crate::models::task::{Priority, TaskDraft, TodoRecord};
use crate::services::chat_client::{ChatCompletionClient, ChatExecutor};
use crate::services::journal_analysis::parse_labeled_insight;
use crate::services::prompt_templates::{
    build_journal_messages, build_plan_messages, build_quick_start_messages,
    build_refine_messages, build_schedule_advice_messages, build_split_messages,
};
use crate::services::rate_limiter::RateLimiter;
use crate::services::response_normalizer::{parse_json, strip_control_chars};
use crate::services::schedule_utils::{add_minutes, parse_model_timestamp};
use crate::utils::redact::redact_sensitive_data;

const DEFAULT_ESTIMATE_MINUTES: u32 = 30;

/// Prompt-building and reply-mapping for every AI feature of the app.
///
/// Errors from the executor and the parsers propagate untouched; the only
/// local recovery is the documented default substitution for missing fields.
pub struct AiService {
    executor: Arc<dyn ChatExecutor>,
}

impl AiService {
    pub fn new(executor: Arc<dyn ChatExecutor>) -> Self {
        Self { executor }
    }

    /// Build the HTTP-backed service with its own rate limiter.
    pub fn from_settings(settings: &AiSettings) -> AppResult<Self> {
        let limiter = Arc::new(RateLimiter::new(settings.min_request_interval()));
        let client = ChatCompletionClient::try_new(settings, limiter)?;
        Ok(Self::new(Arc::new(client)))
    }

    pub async fn split_tasks(&self, content: &str) -> AppResult<Vec<TaskDraft>> {
        if content.trim().is_empty() {
            return Err(AppError::empty_input("请输入任务内容"));
        }

        let reply = self.executor.execute(&build_split_messages(content)).await?;
        let parsed: JsonValue = parse_json(&reply, "splitTasks")?;

        if !parsed.is_array() {
            debug!(target: "app::ai", "split reply is not an array, nothing to split");
            return Ok(Vec::new());
        }

        let drafts: Vec<TaskDraft> = serde_json::from_value(parsed).map_err(|err| {
            AppError::parse_failure_with_details(
                format!("任务结构无效: {err}"),
                Some(json!({ "operation": "splitTasks", "reason": "invalid_task" })),
            )
        })?;

        info!(target: "app::ai", count = drafts.len(), "tasks split");
        Ok(drafts)
    }

    pub async fn plan_tasks(
        &self,
        tasks: &[TodoRecord],
        preferences: &UserPreferences,
    ) -> AppResult<ScheduleProposal> {
        self.plan_tasks_at(tasks, preferences, Local::now().into())
            .await
    }

    /// Plan against an explicit "now"; timestamps without an offset are read
    /// in `now`'s offset.
    pub async fn plan_tasks_at(
        &self,
        tasks: &[TodoRecord],
        preferences: &UserPreferences,
        now: DateTime<FixedOffset>,
    ) -> AppResult<ScheduleProposal> {
        if tasks.is_empty() {
            return Err(AppError::empty_input("没有需要规划的任务"));
        }

        let messages = build_plan_messages(tasks, preferences, now);
        let reply = self.executor.execute(&messages).await?;
        let parsed: JsonValue = parse_json(&strip_control_chars(&reply), "planTasks")?;

        debug!(
            target: "app::planner",
            reply = %redact_sensitive_data(&parsed),
            "planner reply received"
        );

        let known_ids: HashSet<&str> = tasks.iter().map(|task| task.id.as_str()).collect();
        let proposal = validate_schedule(&parsed, &known_ids, now)?;

        info!(
            target: "app::planner",
            scheduled = proposal.tasks.len(),
            "schedule proposal accepted"
        );
        Ok(proposal)
    }

    pub async fn generate_quick_start_suggestion(
        &self,
        task: &TodoRecord,
    ) -> AppResult<QuickStartSuggestion> {
        let reply = self
            .executor
            .execute(&build_quick_start_messages(task))
            .await?;
        let parsed: JsonValue = parse_json(&reply, "quickStart")?;

        Ok(QuickStartSuggestion {
            quick_start: text_field(&parsed, &["quickStart", "quick_start"])
                .unwrap_or_else(|| QUICK_START_FALLBACK.to_string()),
            completion: text_field(&parsed, &["completion"])
                .unwrap_or_else(|| COMPLETION_FALLBACK.to_string()),
        })
    }

    pub async fn analyze_journal(&self, content: &str) -> AppResult<JournalInsight> {
        if content.trim().is_empty() {
            return Err(AppError::empty_input("日记内容不能为空"));
        }

        let reply = self
            .executor
            .execute(&build_journal_messages(content))
            .await?;
        let insight = parse_labeled_insight(&reply).with_fallbacks();

        debug!(target: "app::journal", "journal analysed");
        Ok(insight)
    }

    /// Positional form of [`AiService::analyze_journal`]: 5 scalars, 4 action
    /// items, 2 mindfulness items.
    pub async fn analyze_journal_flat(&self, content: &str) -> AppResult<Vec<String>> {
        Ok(self.analyze_journal(content).await?.to_flat())
    }

    /// Let the model tighten titles and estimates of drafts the user typed.
    pub async fn refine_tasks(&self, drafts: &[TaskDraft]) -> AppResult<Vec<TaskDraft>> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }

        let reply = self
            .executor
            .execute(&build_refine_messages(drafts))
            .await?;
        let parsed: JsonValue = parse_json(&reply, "refineTasks")?;

        let tasks = parsed
            .get("tasks")
            .filter(|value| value.is_array())
            .cloned()
            .ok_or_else(|| {
                AppError::parse_failure_with_details(
                    "无效的响应格式",
                    Some(json!({ "operation": "refineTasks", "reason": "missing_tasks" })),
                )
            })?;

        serde_json::from_value(tasks).map_err(|err| {
            AppError::parse_failure_with_details(
                format!("任务结构无效: {err}"),
                Some(json!({ "operation": "refineTasks", "reason": "invalid_task" })),
            )
        })
    }

    /// Free-form advice on how to run the given tasks today.
    pub async fn suggest_schedule_optimization(
        &self,
        tasks: &[TodoRecord],
        preferences: &UserPreferences,
    ) -> AppResult<Vec<AiTaskSuggestion>> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let reply = self
            .executor
            .execute(&build_schedule_advice_messages(tasks, preferences))
            .await?;

        Ok(vec![AiTaskSuggestion {
            kind: AiSuggestionKind::Optimization,
            content: reply.trim().to_string(),
        }])
    }
}

/// First non-blank text under `keys`. A list of strings is joined line by line.
fn text_field(value: &JsonValue, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find_map(|field| match field {
            JsonValue::String(text) => Some(text.trim().to_string()),
            JsonValue::Array(items) => Some(
                items
                    .iter()
                    .filter_map(JsonValue::as_str)
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            _ => None,
        })
        .filter(|text| !text.is_empty())
}

fn incomplete(reason: &str) -> AppError {
    AppError::parse_failure_with_details(
        "返回的数据结构不完整",
        Some(json!({ "operation": "planTasks", "reason": reason })),
    )
}

/// All-or-nothing check of a planner reply against the tasks it was given.
fn validate_schedule(
    parsed: &JsonValue,
    known_ids: &HashSet<&str>,
    now: DateTime<FixedOffset>,
) -> AppResult<ScheduleProposal> {
    let root = parsed.as_object().ok_or_else(|| incomplete("not_an_object"))?;

    let entries = root
        .get("tasks")
        .and_then(JsonValue::as_array)
        .filter(|entries| !entries.is_empty())
        .ok_or_else(|| incomplete("missing_tasks"))?;
    let suggestion =
        text_field(parsed, &["suggestion"]).ok_or_else(|| incomplete("missing_suggestion"))?;
    let planning_logic = text_field(parsed, &["planningLogic", "planning_logic"])
        .ok_or_else(|| incomplete("missing_planning_logic"))?;

    let tasks = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| validate_entry(index, entry, known_ids, now))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ScheduleProposal {
        tasks,
        suggestion,
        planning_logic,
    })
}

fn validate_entry(
    index: usize,
    entry: &JsonValue,
    known_ids: &HashSet<&str>,
    now: DateTime<FixedOffset>,
) -> AppResult<ScheduledTask> {
    let fields = entry.as_object().ok_or_else(|| {
        AppError::parse_failure_with_details(
            "任务条目格式无效",
            Some(json!({ "operation": "planTasks", "index": index })),
        )
    })?;

    let id = match fields.get("id") {
        Some(JsonValue::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
        Some(JsonValue::Number(id)) => id.to_string(),
        _ => {
            return Err(AppError::parse_failure_with_details(
                "任务缺少ID",
                Some(json!({ "operation": "planTasks", "index": index })),
            ))
        }
    };

    if !known_ids.contains(id.as_str()) {
        return Err(AppError::invalid_schedule(
            "规划包含未知任务",
            Some(json!({ "taskId": id })),
        ));
    }

    let estimated = fields
        .get("estimated_time")
        .and_then(loose_minutes)
        .unwrap_or(DEFAULT_ESTIMATE_MINUTES);

    let start_time = match timestamp_field(fields, "start_time", &id, now)? {
        Some(start) => start,
        None => now.with_timezone(&Utc),
    };
    let end_time = match timestamp_field(fields, "end_time", &id, now)? {
        Some(end) => end,
        None => add_minutes(start_time, estimated)?,
    };

    if end_time < start_time {
        return Err(AppError::invalid_schedule(
            "结束时间早于开始时间",
            Some(json!({
                "taskId": id,
                "startTime": start_time.to_rfc3339(),
                "endTime": end_time.to_rfc3339(),
            })),
        ));
    }

    Ok(ScheduledTask {
        id,
        start_time,
        end_time,
        estimated_time_minutes: estimated,
        priority: fields
            .get("priority")
            .map(Priority::from_loose)
            .unwrap_or_default(),
    })
}

/// `Ok(None)` when the field is absent, null or blank.
fn timestamp_field(
    fields: &JsonMap<String, JsonValue>,
    key: &str,
    task_id: &str,
    now: DateTime<FixedOffset>,
) -> AppResult<Option<DateTime<Utc>>> {
    match fields.get(key) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(raw)) if raw.trim().is_empty() => Ok(None),
        Some(JsonValue::String(raw)) => parse_model_timestamp(raw, *now.offset())
            .map(Some)
            .ok_or_else(|| invalid_time(key, task_id, raw)),
        Some(other) => Err(invalid_time(key, task_id, &other.to_string())),
    }
}

fn invalid_time(key: &str, task_id: &str, raw: &str) -> AppError {
    AppError::invalid_schedule(
        "无效的时间格式",
        Some(json!({ "taskId": task_id, "field": key, "value": raw })),
    )
}
