use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use daybook_app_lib::db::memory::MemoryStore;
use daybook_app_lib::db::TaskStore;
use daybook_app_lib::error::AppError;
use daybook_app_lib::models::settings::UserPreferences;
use daybook_app_lib::models::task::{NewTodo, Priority, TaskStatus, TodoRecord};
use daybook_app_lib::services::ai_service::AiService;
use daybook_app_lib::services::chat_client::testing::ScriptedExecutor;
use daybook_app_lib::services::planner_service::PlannerService;

struct Fixture {
    executor: Arc<ScriptedExecutor>,
    store: Arc<MemoryStore>,
    planner: PlannerService,
}

fn fixture() -> Fixture {
    let executor = Arc::new(ScriptedExecutor::new());
    let store = Arc::new(MemoryStore::signed_in("user-1"));
    let ai = Arc::new(AiService::new(executor.clone()));
    let planner = PlannerService::new(ai, store.clone(), store.clone(), store.clone());
    Fixture {
        executor,
        store,
        planner,
    }
}

fn shanghai_morning() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(8 * 3600)
        .expect("offset")
        .with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
        .single()
        .expect("time")
}

async fn add_task(store: &MemoryStore, title: &str, status: TaskStatus) -> TodoRecord {
    store
        .create_task(NewTodo {
            user_id: "user-1".into(),
            title: title.into(),
            description: None,
            due_date: None,
            priority: Priority::Medium,
            status,
            estimated_time: Some(30),
            start_time: None,
            subtasks: None,
        })
        .await
        .expect("task")
}

#[tokio::test]
async fn proposal_is_validated_then_applied() {
    let fixture = fixture();
    let report = add_task(&fixture.store, "写报告", TaskStatus::InProgress).await;
    let gym = add_task(&fixture.store, "健身", TaskStatus::InProgress).await;
    let later = add_task(&fixture.store, "整理照片", TaskStatus::Pending).await;

    fixture.executor.push_reply(format!(
        r#"{{"tasks":[
              {{"id":"{report}","start_time":"2025-03-01T09:30:00+08:00","end_time":"2025-03-01T11:00:00+08:00","estimated_time":90,"priority":1}},
              {{"id":"{gym}","start_time":"2025-03-01 18:00","estimated_time":"60"}}
           ],
           "suggestion":"上午写报告，傍晚健身",
           "planningLogic":"先难后易"}}"#,
        report = report.id,
        gym = gym.id,
    ));

    let proposal = fixture
        .planner
        .plan_in_progress_at(&UserPreferences::default(), shanghai_morning())
        .await
        .expect("proposal");

    assert_eq!(proposal.tasks.len(), 2);
    for task in &proposal.tasks {
        assert!(task.end_time >= task.start_time);
    }

    let report = fixture.store.task(&report.id).expect("report");
    assert_eq!(
        report.start_time,
        Some(Utc.with_ymd_and_hms(2025, 3, 1, 1, 30, 0).unwrap())
    );
    assert_eq!(report.estimated_time, Some(90));

    let gym = fixture.store.task(&gym.id).expect("gym");
    assert_eq!(
        gym.end_time,
        Some(Utc.with_ymd_and_hms(2025, 3, 1, 11, 0, 0).unwrap())
    );

    assert!(fixture.store.task(&later.id).expect("later").start_time.is_none());

    let prompt = &fixture.executor.conversations()[0][1].content;
    assert!(prompt.contains("写报告"));
    assert!(!prompt.contains("整理照片"));
}

#[tokio::test]
async fn unparseable_time_leaves_every_task_untouched() {
    let fixture = fixture();
    let first = add_task(&fixture.store, "写报告", TaskStatus::InProgress).await;
    let second = add_task(&fixture.store, "健身", TaskStatus::InProgress).await;

    fixture.executor.push_reply(format!(
        r#"{{"tasks":[
              {{"id":"{first}","start_time":"2025-03-01T09:30:00+08:00"}},
              {{"id":"{second}","start_time":"傍晚"}}
           ],
           "suggestion":"s","planningLogic":"l"}}"#,
        first = first.id,
        second = second.id,
    ));

    let error = fixture
        .planner
        .plan_in_progress_at(&UserPreferences::default(), shanghai_morning())
        .await
        .expect_err("invalid schedule");
    assert!(matches!(error, AppError::InvalidSchedule { .. }));

    for id in [&first.id, &second.id] {
        let task = fixture.store.task(id).expect("task");
        assert!(task.start_time.is_none());
        assert!(task.end_time.is_none());
    }
}

#[tokio::test]
async fn inverted_range_is_rejected() {
    let fixture = fixture();
    let task = add_task(&fixture.store, "写报告", TaskStatus::InProgress).await;

    fixture.executor.push_reply(format!(
        r#"{{"tasks":[{{"id":"{id}","start_time":"2025-03-01T12:00:00+08:00","end_time":"2025-03-01T11:00:00+08:00"}}],
           "suggestion":"s","planningLogic":"l"}}"#,
        id = task.id,
    ));

    let error = fixture
        .planner
        .plan_in_progress_at(&UserPreferences::default(), shanghai_morning())
        .await
        .expect_err("inverted");
    assert!(matches!(error, AppError::InvalidSchedule { .. }));
    assert!(fixture.store.task(&task.id).expect("task").end_time.is_none());
}

#[tokio::test]
async fn unknown_task_ids_are_rejected() {
    let fixture = fixture();
    add_task(&fixture.store, "写报告", TaskStatus::InProgress).await;
    fixture.executor.push_reply(
        r#"{"tasks":[{"id":"not-a-task","start_time":"2025-03-01T09:30:00+08:00"}],"suggestion":"s","planningLogic":"l"}"#,
    );

    let error = fixture
        .planner
        .plan_in_progress_at(&UserPreferences::default(), shanghai_morning())
        .await
        .expect_err("unknown id");
    assert!(matches!(error, AppError::InvalidSchedule { .. }));
}

#[tokio::test]
async fn nothing_in_progress_means_no_request() {
    let fixture = fixture();
    add_task(&fixture.store, "整理照片", TaskStatus::Pending).await;

    let error = fixture
        .planner
        .plan_in_progress_at(&UserPreferences::default(), shanghai_morning())
        .await
        .expect_err("nothing to plan");
    assert!(
        matches!(error, AppError::Validation { ref message, .. } if message == "没有进行中的任务需要规划")
    );
    assert_eq!(fixture.executor.calls(), 0);
}

#[tokio::test]
async fn invalid_preferences_are_rejected_before_planning() {
    let fixture = fixture();
    add_task(&fixture.store, "写报告", TaskStatus::InProgress).await;

    let preferences = UserPreferences {
        sleep_time: "半夜".into(),
        ..UserPreferences::default()
    };
    let error = fixture
        .planner
        .plan_in_progress_at(&preferences, shanghai_morning())
        .await
        .expect_err("bad preferences");
    assert!(matches!(error, AppError::Validation { .. }));
    assert_eq!(fixture.executor.calls(), 0);
}

#[tokio::test]
async fn schedule_advice_covers_pending_tasks() {
    let fixture = fixture();
    add_task(&fixture.store, "整理照片", TaskStatus::Pending).await;
    fixture.executor.push_reply("1. 晚饭后整理照片");

    let advice = fixture
        .planner
        .schedule_advice(&UserPreferences::default())
        .await
        .expect("advice");

    assert_eq!(advice.len(), 1);
    assert!(fixture.executor.conversations()[0][1]
        .content
        .contains("- 整理照片（预计30分钟）"));
}
