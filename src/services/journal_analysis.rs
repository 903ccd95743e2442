use tracing::trace;

use crate::models::journal::{
    JournalInsight, ACTION_SUGGESTION_COUNT, DEFAULT_ACTION_SUGGESTIONS,
    DEFAULT_MINDFULNESS_TIPS, MINDFULNESS_TIP_COUNT,
};

const BULLET: &str = "• ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Action,
    Mindfulness,
}

/// Single-pass scan of the labeled reply produced by the journal prompt.
///
/// Scalar labels set their field; `行为建议：` and `正念提醒：` open a bullet
/// list that collects `• ` lines up to 4 and 2 items. Missing scalars stay
/// empty; an empty list is replaced by its default list.
pub fn parse_labeled_insight(text: &str) -> JournalInsight {
    let mut insight = JournalInsight::default();
    let mut section = Section::None;

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if let Some(value) = line.strip_prefix("情绪状态：") {
            insight.emotional_state = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("情绪原因：") {
            insight.emotion_cause = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("管理建议：") {
            insight.management_tips = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("思维模式：") {
            insight.thinking_patterns = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("认知偏差：") {
            insight.cognitive_biases = value.trim().to_string();
        } else if line.starts_with("行为建议：") {
            section = Section::Action;
        } else if line.starts_with("正念提醒：") {
            section = Section::Mindfulness;
        } else if let Some(item) = line.strip_prefix(BULLET) {
            let item = item.trim().to_string();
            match section {
                Section::Action if insight.action_suggestions.len() < ACTION_SUGGESTION_COUNT => {
                    insight.action_suggestions.push(item)
                }
                Section::Mindfulness
                    if insight.mindfulness_tips.len() < MINDFULNESS_TIP_COUNT =>
                {
                    insight.mindfulness_tips.push(item)
                }
                _ => trace!(target: "app::journal", ?section, "bullet outside an open list dropped"),
            }
        } else {
            trace!(
                target: "app::journal",
                line_chars = line.chars().count(),
                "unrecognized journal analysis line ignored"
            );
        }
    }

    if insight.action_suggestions.is_empty() {
        insight.action_suggestions = DEFAULT_ACTION_SUGGESTIONS
            .iter()
            .map(|item| item.to_string())
            .collect();
    }
    if insight.mindfulness_tips.is_empty() {
        insight.mindfulness_tips = DEFAULT_MINDFULNESS_TIPS
            .iter()
            .map(|item| item.to_string())
            .collect();
    }

    insight
}
