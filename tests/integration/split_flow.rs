use std::sync::Arc;

use daybook_app_lib::db::memory::MemoryStore;
use daybook_app_lib::db::TaskStore;
use daybook_app_lib::error::AppError;
use daybook_app_lib::models::settings::AiSettings;
use daybook_app_lib::models::task::{Priority, TaskStatus};
use daybook_app_lib::services::ai_service::AiService;
use daybook_app_lib::services::planner_service::PlannerService;
use httpmock::prelude::*;
use serde_json::json;

const SPLIT_REPLY: &str = r#"```json
[
  {"title": "买菜", "description": "去超市买一周的食材", "priority": 2, "estimated_time": 40},
  {"title": "写报告", "description": "完成季度总结", "priority": 1, "estimated_time": 120},
  {"title": "健身", "priority": 3, "estimated_time": 60}
]
```"#;

fn settings_for(server: &MockServer) -> AiSettings {
    AiSettings {
        api_key: Some("test-key".into()),
        base_url: server.base_url(),
        ..AiSettings::default()
    }
}

async fn split_server() -> MockServer {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .body_contains("任务列表：")
                .body_contains("买菜");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "role": "assistant", "content": SPLIT_REPLY } }]
            }));
        })
        .await;
    server
}

#[tokio::test]
async fn split_returns_the_stub_tasks_verbatim() {
    let server = split_server().await;
    let service = AiService::from_settings(&settings_for(&server)).expect("service");

    let drafts = service
        .split_tasks("买菜\n写报告\n健身")
        .await
        .expect("drafts");

    let summary: Vec<(&str, Priority, Option<u32>)> = drafts
        .iter()
        .map(|draft| {
            (
                draft.title.as_str(),
                draft.priority,
                draft.estimated_time_minutes,
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("买菜", Priority::Medium, Some(40)),
            ("写报告", Priority::High, Some(120)),
            ("健身", Priority::Low, Some(60)),
        ]
    );
    assert_eq!(drafts[1].description.as_deref(), Some("完成季度总结"));
    assert!(drafts[2].description.is_none());
}

#[tokio::test]
async fn split_and_create_puts_tasks_in_progress() {
    let server = split_server().await;
    let service = Arc::new(AiService::from_settings(&settings_for(&server)).expect("service"));
    let store = Arc::new(MemoryStore::signed_in("user-1"));
    let planner = PlannerService::new(service, store.clone(), store.clone(), store.clone());

    let created = planner
        .split_and_create("买菜\n写报告\n健身")
        .await
        .expect("created");

    assert_eq!(created.len(), 3);
    assert!(created
        .iter()
        .all(|task| task.status == TaskStatus::InProgress && task.start_time.is_some()));

    let stored = store
        .list_tasks("user-1", Some(TaskStatus::InProgress))
        .await
        .expect("list");
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[1].estimated_time, Some(120));
}

#[tokio::test]
async fn empty_split_creates_nothing() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "content": "{\"message\":\"没有任务\"}" } }]
            }));
        })
        .await;

    let service = Arc::new(AiService::from_settings(&settings_for(&server)).expect("service"));
    let store = Arc::new(MemoryStore::signed_in("user-1"));
    let planner = PlannerService::new(service, store.clone(), store.clone(), store.clone());

    let error = planner
        .split_and_create("随便聊聊")
        .await
        .expect_err("nothing to split");
    assert!(matches!(error, AppError::Validation { ref message, .. } if message == "未能正确拆分任务"));
    assert!(store.list_tasks("user-1", None).await.expect("list").is_empty());
}

#[tokio::test]
async fn split_requires_a_signed_in_user() {
    let server = MockServer::start_async().await;
    let service = Arc::new(AiService::from_settings(&settings_for(&server)).expect("service"));
    let store = Arc::new(MemoryStore::new());
    let planner = PlannerService::new(service, store.clone(), store.clone(), store);

    let error = planner.split_and_create("买菜").await.expect_err("signed out");
    assert!(matches!(error, AppError::Validation { ref message, .. } if message == "未登录"));
}
