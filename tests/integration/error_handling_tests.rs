use std::sync::Arc;

use chrono::NaiveDate;
use daybook_app_lib::commands::ai_commands::{
    ai_analyze_journal, ai_plan_tasks, ai_quick_start, ai_split_tasks, JournalAnalysisRequest,
    SplitTasksRequest,
};
use daybook_app_lib::commands::task::{tasks_set_status, StatusChangePayload};
use daybook_app_lib::commands::AppState;
use daybook_app_lib::db::memory::MemoryStore;
use daybook_app_lib::models::journal::JournalSections;
use daybook_app_lib::models::settings::AiSettings;
use daybook_app_lib::models::task::{Priority, TaskStatus, TodoRecord};
use daybook_app_lib::services::ai_service::AiService;
use daybook_app_lib::services::chat_client::testing::ScriptedExecutor;
use daybook_app_lib::services::settings_service::SettingsService;
use httpmock::prelude::*;
use serde_json::json;
use tempfile::TempDir;

struct Harness {
    state: AppState,
    store: Arc<MemoryStore>,
    _dir: TempDir,
}

fn harness_with(ai: Arc<AiService>) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = Arc::new(SettingsService::new(Some(dir.path().join("daybook.yaml"))));
    let store = Arc::new(MemoryStore::signed_in("user-1"));
    let state = AppState::from_parts(settings, ai, store.clone(), store.clone(), store.clone());
    Harness {
        state,
        store,
        _dir: dir,
    }
}

fn scripted(replies: impl IntoIterator<Item = &'static str>) -> (Arc<ScriptedExecutor>, Harness) {
    let executor = Arc::new(ScriptedExecutor::replying(replies));
    let harness = harness_with(Arc::new(AiService::new(executor.clone())));
    (executor, harness)
}

fn record(id: &str) -> TodoRecord {
    TodoRecord {
        id: id.into(),
        user_id: "user-1".into(),
        title: "写报告".into(),
        description: None,
        due_date: None,
        priority: Priority::High,
        status: TaskStatus::InProgress,
        estimated_time: Some(60),
        start_time: None,
        end_time: None,
        ai_suggestions: None,
        subtasks: None,
    }
}

#[tokio::test]
async fn blank_split_input_is_empty_input() {
    let (executor, harness) = scripted([]);

    let error = ai_split_tasks(
        &harness.state,
        SplitTasksRequest {
            content: "  \n ".into(),
        },
    )
    .await
    .expect_err("blank");

    assert_eq!(error.code, "EMPTY_INPUT");
    assert_eq!(error.message, "请输入任务内容");
    assert_eq!(executor.calls(), 0);
}

#[tokio::test]
async fn exhausted_retries_surface_attempts_and_correlation_id() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(502)
                .json_body(json!({ "error": { "message": "bad gateway" } }));
        })
        .await;

    let ai = AiService::from_settings(&AiSettings {
        api_key: Some("test-key".into()),
        base_url: server.base_url(),
        max_attempts: 2,
        backoff_base_ms: 10,
        backoff_cap_ms: 20,
        min_request_interval_ms: 0,
        ..AiSettings::default()
    })
    .expect("service");
    let harness = harness_with(Arc::new(ai));

    let error = ai_split_tasks(
        &harness.state,
        SplitTasksRequest {
            content: "买菜".into(),
        },
    )
    .await
    .expect_err("upstream down");

    assert_eq!(mock.hits_async().await, 2);
    assert_eq!(error.code, "REQUEST_FAILURE");
    assert!(error.message.contains("502 - bad gateway"));
    assert!(error.correlation_id().is_some_and(|id| !id.is_empty()));
    assert_eq!(
        error.details.as_ref().and_then(|details| details.get("attempts")),
        Some(&json!(2))
    );
}

#[tokio::test]
async fn non_json_reply_is_parse_failure() {
    let (_, harness) = scripted(["好的，我来帮你拆分任务"]);

    let error = ai_split_tasks(
        &harness.state,
        SplitTasksRequest {
            content: "买菜".into(),
        },
    )
    .await
    .expect_err("prose");

    assert_eq!(error.code, "PARSE_FAILURE");
    assert_eq!(
        error.details.as_ref().and_then(|details| details.get("operation")),
        Some(&json!("splitTasks"))
    );
}

#[tokio::test]
async fn quick_start_with_prose_reply_is_parse_failure() {
    let (_, harness) = scripted(["先深呼吸"]);

    let error = ai_quick_start(&harness.state, record("task-1"))
        .await
        .expect_err("prose");
    assert_eq!(error.code, "PARSE_FAILURE");
}

#[tokio::test]
async fn invalid_schedule_reaches_the_command_caller() {
    let executor = Arc::new(ScriptedExecutor::new());
    let harness = harness_with(Arc::new(AiService::new(executor.clone())));
    let created = harness
        .state
        .planner()
        .quick_add("写报告")
        .await
        .expect("quick add")
        .expect("created");

    executor.push_reply(format!(
        r#"{{"tasks":[{{"id":"{}","start_time":"明天上午"}}],"suggestion":"s","planningLogic":"l"}}"#,
        created.id
    ));

    let error = ai_plan_tasks(&harness.state).await.expect_err("invalid");
    assert_eq!(error.code, "INVALID_SCHEDULE");
    assert_eq!(
        error.details.as_ref().and_then(|details| details.get("taskId")),
        Some(&json!(created.id))
    );
    assert!(harness
        .store
        .task(&created.id)
        .is_some_and(|task| task.end_time.is_none()));
}

#[tokio::test]
async fn unknown_task_status_change_is_not_found() {
    let (_, harness) = scripted([]);

    let error = tasks_set_status(
        &harness.state,
        StatusChangePayload {
            task_id: "missing".into(),
            status: TaskStatus::Completed,
        },
    )
    .await
    .expect_err("missing task");

    assert_eq!(error.code, "NOT_FOUND");
    assert!(error.details.is_none());
}

#[tokio::test]
async fn signed_out_commands_are_validation_errors() {
    let (_, harness) = scripted([]);
    harness.store.sign_out();

    let error = ai_analyze_journal(
        &harness.state,
        JournalAnalysisRequest {
            date: NaiveDate::from_ymd_opt(2025, 3, 1).expect("date"),
            sections: JournalSections {
                reflection: "今天不错".into(),
                ..JournalSections::default()
            },
        },
    )
    .await
    .expect_err("signed out");

    assert_eq!(error.code, "VALIDATION_ERROR");
    assert_eq!(error.message, "未登录");
}

#[tokio::test]
async fn missing_api_key_fails_state_construction() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("daybook.yaml"), "ai:\n  api_key: \"  \"\n").expect("write");
    let settings = Arc::new(SettingsService::new(Some(dir.path().join("daybook.yaml"))));
    let store = Arc::new(MemoryStore::signed_in("user-1"));

    if std::env::var("DAYBOOK_AI_API_KEY").is_ok() {
        return;
    }
    let error = AppState::new(settings, store.clone(), store.clone(), store)
        .err()
        .expect("no key configured");
    assert_eq!(error.code().as_str(), "CONFIG_ERROR");
}
