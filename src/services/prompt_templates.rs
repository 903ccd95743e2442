use chrono::{DateTime, FixedOffset};
use serde_json::json;

use crate::models::ai::PromptMessage;
use crate::models::settings::UserPreferences;
use crate::models::task::{TaskDraft, TodoRecord};
use crate::services::schedule_utils::format_clock;

/// System prompt for splitting free text into task objects.
pub fn task_split_system_prompt() -> &'static str {
    r#"你是一个任务分析专家。请把用户输入的任务列表拆分为结构化的 JSON 数组。要求：
1. 每个任务都应该具体且可执行
2. 设置合理的优先级（1 最高，3 最低）
3. 估算所需时间（分钟）
4. 必要时添加子任务

只返回 JSON 数组，格式示例：
[
  {
    "title": "任务标题",
    "description": "简短描述",
    "priority": 1,
    "estimated_time": 30,
    "subtasks": [
      { "id": "1", "title": "子任务1", "completed": false }
    ]
  }
]"#
}

/// System prompt for assigning start/end times to existing tasks.
pub fn schedule_planning_system_prompt() -> &'static str {
    r#"你是一个时间管理 AI 助手。请分析任务并返回 JSON 格式的时间规划建议。
返回内容必须是有效的 JSON，不要包含任何控制字符：
{
  "tasks": [
    {
      "id": "任务ID",
      "start_time": "ISO 8601 时间",
      "end_time": "ISO 8601 时间",
      "estimated_time": 30,
      "priority": 1
    }
  ],
  "suggestion": "整体执行建议",
  "planningLogic": "时间安排逻辑说明"
}"#
}

/// System prompt for the focus-mode coach.
pub fn quick_start_system_prompt() -> &'static str {
    r#"你是一位专业的任务教练。请提供两种建议：
1. 快速启动：用一句话说明如何在 1 分钟内开始这个任务（不超过 30 字）
2. 完成建议：3-4 点简短的任务完成策略

建议要求：
- 快速启动要具体、立即可执行
- 完成建议要简洁、可操作
- 使用鼓励性的语言
- 避免空泛的建议"#
}

/// System prompt for journal analysis. The labels must match the parser in
/// `journal_analysis`.
pub fn journal_analysis_system_prompt() -> &'static str {
    r#"作为一位专业的心理分析师，请分析用户的日记内容，并严格按照以下格式返回分析结果：

情绪状态：[描述当前的情绪状态]
情绪原因：[分析导致这些情绪的原因]
管理建议：[如何管理和改善这些情绪]
思维模式：[分析体现出的思维方式]
认知偏差：[指出可能存在的认知偏差]
行为建议：
• [具体建议1]
• [具体建议2]
• [具体建议3]
• [具体建议4]
正念提醒：
• [放松提示1]
• [放松提示2]

注意：
1. 必须严格按照上述格式返回，包括"•"符号
2. 行为建议必须提供 4 条
3. 正念提醒必须提供 2 条
4. 所有建议要具体可执行
5. 分析要与日记内容紧密相关"#
}

pub fn task_refine_system_prompt() -> &'static str {
    "你是任务管理专家。分析并拆分任务，返回 JSON 格式结果。注重实用性和可执行性。"
}

pub fn schedule_advice_system_prompt() -> &'static str {
    "你是专业的时间管理顾问。请提供具体、可执行的时间规划建议。"
}

pub fn build_split_messages(content: &str) -> Vec<PromptMessage> {
    vec![
        PromptMessage::system(task_split_system_prompt()),
        PromptMessage::user(format!("任务列表：\n{content}")),
    ]
}

pub fn build_plan_messages(
    tasks: &[TodoRecord],
    preferences: &UserPreferences,
    now: DateTime<FixedOffset>,
) -> Vec<PromptMessage> {
    let task_list = serde_json::to_string_pretty(tasks).unwrap_or_else(|_| "[]".to_string());
    let user = format!(
        "请为以下任务安排时间：\n任务列表：{task_list}\n\n限制条件：\n1. 从{start}开始安排\n2. 睡觉时间：{sleep}前完成\n3. 任务间隔：{gap}分钟休息\n4. 按优先级和预计用时合理安排",
        start = format_clock(now),
        sleep = preferences.sleep_time,
        gap = preferences.break_duration,
    );

    vec![
        PromptMessage::system(schedule_planning_system_prompt()),
        PromptMessage::user(user),
    ]
}

pub fn build_quick_start_messages(task: &TodoRecord) -> Vec<PromptMessage> {
    let estimated = task
        .estimated_time
        .map(|minutes| minutes.to_string())
        .unwrap_or_else(|| "未设置".to_string());
    let example = json!({
        "quickStart": "准备好笔记本，立即写下第一个想法",
        "completion": "• 记录关键思路\n• 分段完成\n• 及时总结"
    });
    let example = serde_json::to_string_pretty(&example).unwrap_or_default();

    let user = format!(
        "任务：{title}\n预计用时：{estimated}分钟\n优先级：{priority}\n\n请提供：\n1. 一句话的快速启动建议\n2. 3-4点完成策略\n\n返回格式：\n{example}",
        title = task.title,
        priority = task.priority,
    );

    vec![
        PromptMessage::system(quick_start_system_prompt()),
        PromptMessage::user(user),
    ]
}

pub fn build_journal_messages(content: &str) -> Vec<PromptMessage> {
    vec![
        PromptMessage::system(journal_analysis_system_prompt()),
        PromptMessage::user(format!("请分析以下日记内容：\n\n{content}")),
    ]
}

pub fn build_refine_messages(drafts: &[TaskDraft]) -> Vec<PromptMessage> {
    let task_list = serde_json::to_string(drafts).unwrap_or_else(|_| "[]".to_string());
    let user = format!(
        r#"作为任务分析专家，请分析并拆分以下任务列表。
对于每个任务：
1. 如果任务描述过于宽泛，将其拆分为更具体、可执行的子任务
2. 为每个任务估算合理的完成时间（分钟）
3. 设置任务优先级（1最高，3最低）

请返回 JSON 格式：
{{
  "tasks": [
    {{ "title": "具体的任务描述", "estimated_time": 30, "priority": 2 }}
  ]
}}

任务列表：{task_list}"#
    );

    vec![
        PromptMessage::system(task_refine_system_prompt()),
        PromptMessage::user(user),
    ]
}

pub fn build_schedule_advice_messages(
    tasks: &[TodoRecord],
    preferences: &UserPreferences,
) -> Vec<PromptMessage> {
    let task_lines = tasks
        .iter()
        .map(|task| match task.estimated_time {
            Some(minutes) => format!("- {}（预计{}分钟）", task.title, minutes),
            None => format!("- {}（预计时间未设置）", task.title),
        })
        .collect::<Vec<_>>()
        .join("\n");

    let user = format!(
        "作为时间管理专家，请根据以下信息制定任务执行计划：\n\n用户偏好：\n- 起床时间：{wake}\n- 睡觉时间：{sleep}\n- 专注时长：{focus}分钟\n- 休息时长：{rest}分钟\n- 每日目标：{goal}分钟\n\n待处理任务：\n{task_lines}\n\n请提供一个结构化的时间规划建议（200字左右），包含：\n\n1. 任务优先级和执行顺序\n2. 具体的时间段安排\n3. 休息时间建议\n4. 注意事项\n\n格式要求：\n- 分点列出，简明扼要\n- 重点突出时间安排\n- 考虑用户作息习惯\n- 建议切实可行",
        wake = preferences.wake_time,
        sleep = preferences.sleep_time,
        focus = preferences.focus_duration,
        rest = preferences.break_duration,
        goal = preferences.daily_focus_goal,
    );

    vec![
        PromptMessage::system(schedule_advice_system_prompt()),
        PromptMessage::user(user),
    ]
}
