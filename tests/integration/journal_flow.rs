use std::sync::Arc;

use chrono::NaiveDate;
use daybook_app_lib::db::memory::MemoryStore;
use daybook_app_lib::db::JournalStore;
use daybook_app_lib::error::AppError;
use daybook_app_lib::models::journal::{
    JournalSections, DEFAULT_MINDFULNESS_TIPS, EMOTION_CAUSE_FALLBACK,
};
use daybook_app_lib::services::ai_service::AiService;
use daybook_app_lib::services::chat_client::testing::ScriptedExecutor;
use daybook_app_lib::services::planner_service::PlannerService;

const ANALYSIS: &str = "情绪状态：有些焦虑但整体平稳
情绪原因：工作截止日期临近
管理建议：把大任务拆小，每完成一块就休息
思维模式：倾向于提前担心结果
认知偏差：灾难化思维
行为建议：
• 早上先处理最难的任务
• 午饭后散步十分钟
正念提醒：
• 睡前做五分钟呼吸练习";

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).expect("date")
}

fn sections(reflection: &str) -> JournalSections {
    JournalSections {
        reflection: reflection.into(),
        emotion: "紧张".into(),
        mindfulness: String::new(),
    }
}

fn planner(executor: &Arc<ScriptedExecutor>, store: &Arc<MemoryStore>) -> PlannerService {
    let ai = Arc::new(AiService::new(executor.clone()));
    PlannerService::new(ai, store.clone(), store.clone(), store.clone())
}

#[tokio::test]
async fn analysis_is_saved_next_to_the_journal() {
    let executor = Arc::new(ScriptedExecutor::replying([ANALYSIS]));
    let store = Arc::new(MemoryStore::signed_in("user-1"));
    let planner = planner(&executor, &store);

    let record = planner
        .analyze_and_save_journal(day(12), &sections("赶了一整天的报告"))
        .await
        .expect("record");

    assert_eq!(record.date, day(12));
    assert_eq!(record.insight.emotional_state, "有些焦虑但整体平稳");
    assert_eq!(record.insight.cognitive_biases, "灾难化思维");
    assert_eq!(record.insight.action_suggestions.len(), 4);
    assert_eq!(record.insight.action_suggestions[0], "早上先处理最难的任务");
    assert_eq!(record.insight.mindfulness_tips[0], "睡前做五分钟呼吸练习");
    assert_eq!(record.insight.mindfulness_tips.len(), 2);

    assert_eq!(store.insight_for(&record.journal_id), Some(record.clone()));

    let entries = store
        .list_entries("user-1", day(1), day(31))
        .await
        .expect("entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].sections().reflection, "赶了一整天的报告");

    let prompt = &executor.conversations()[0][1].content;
    assert!(prompt.contains("赶了一整天的报告"));
    assert!(prompt.contains("紧张"));
}

#[tokio::test]
async fn month_view_shows_the_saved_insight() {
    let executor = Arc::new(ScriptedExecutor::replying([ANALYSIS]));
    let store = Arc::new(MemoryStore::signed_in("user-1"));
    let planner = planner(&executor, &store);

    let record = planner
        .analyze_and_save_journal(day(12), &sections("赶了一整天的报告"))
        .await
        .expect("record");

    let days = planner.month_view(day(20)).await.expect("month");
    assert_eq!(days.len(), 31);

    let twelfth = &days[11];
    assert_eq!(twelfth.date, day(12));
    assert_eq!(
        twelfth.journal.as_ref().map(|entry| entry.id.as_str()),
        Some(record.journal_id.as_str())
    );
    assert_eq!(twelfth.insight.as_ref(), Some(&record));
    assert!(days[10].is_empty());
}

#[tokio::test]
async fn reanalysis_replaces_the_previous_insight() {
    let executor = Arc::new(ScriptedExecutor::replying([
        ANALYSIS,
        "情绪状态：轻松\n行为建议：\n• 保持节奏",
    ]));
    let store = Arc::new(MemoryStore::signed_in("user-1"));
    let planner = planner(&executor, &store);

    let first = planner
        .analyze_and_save_journal(day(12), &sections("赶了一整天的报告"))
        .await
        .expect("first");
    let second = planner
        .analyze_and_save_journal(day(12), &sections("报告交了，心情放松"))
        .await
        .expect("second");

    assert_eq!(first.journal_id, second.journal_id);
    let stored = store.insight_for(&second.journal_id).expect("insight");
    assert_eq!(stored.insight.emotional_state, "轻松");
    assert_eq!(stored.insight.emotion_cause, EMOTION_CAUSE_FALLBACK);
    assert_eq!(stored.insight.action_suggestions[0], "保持节奏");
    assert_eq!(stored.insight.mindfulness_tips, DEFAULT_MINDFULNESS_TIPS.to_vec());

    let insights = store
        .list_insights("user-1", day(1), day(31))
        .await
        .expect("insights");
    assert_eq!(insights.len(), 1);
}

#[tokio::test]
async fn blank_journal_never_reaches_the_model() {
    let executor = Arc::new(ScriptedExecutor::new());
    let store = Arc::new(MemoryStore::signed_in("user-1"));
    let planner = planner(&executor, &store);

    let error = planner
        .analyze_and_save_journal(
            day(12),
            &JournalSections {
                reflection: "   ".into(),
                emotion: "\n".into(),
                mindfulness: String::new(),
            },
        )
        .await
        .expect_err("blank");

    assert!(matches!(error, AppError::EmptyInput { .. }));
    assert_eq!(executor.calls(), 0);
    assert!(store
        .list_entries("user-1", day(1), day(31))
        .await
        .expect("entries")
        .is_empty());
}

#[tokio::test]
async fn failed_analysis_keeps_the_saved_entry() {
    let executor = Arc::new(ScriptedExecutor::new());
    executor.push_error(AppError::other("模型不可用"));
    let store = Arc::new(MemoryStore::signed_in("user-1"));
    let planner = planner(&executor, &store);

    planner
        .analyze_and_save_journal(day(3), &sections("平常的一天"))
        .await
        .expect_err("analysis failed");

    let entries = store
        .list_entries("user-1", day(1), day(31))
        .await
        .expect("entries");
    assert_eq!(entries.len(), 1);
    assert!(store.insight_for(&entries[0].id).is_none());
}
