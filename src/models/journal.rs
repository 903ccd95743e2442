use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const ACTION_SUGGESTION_COUNT: usize = 4;
pub const MINDFULNESS_TIP_COUNT: usize = 2;
pub const FLAT_INSIGHT_LEN: usize = 5 + ACTION_SUGGESTION_COUNT + MINDFULNESS_TIP_COUNT;

pub const DEFAULT_ACTION_SUGGESTIONS: [&str; ACTION_SUGGESTION_COUNT] = [
    "制定每日任务清单，合理分配时间",
    "建立规律的作息时间表",
    "适当休息和运动",
    "与朋友或家人交流分享",
];

pub const DEFAULT_MINDFULNESS_TIPS: [&str; MINDFULNESS_TIP_COUNT] =
    ["每天进行10分钟的深呼吸练习", "保持正念，专注当下的感受"];

pub const EMOTIONAL_STATE_FALLBACK: &str = "暂无情绪分析";
pub const EMOTION_CAUSE_FALLBACK: &str = "暂无原因分析";
pub const MANAGEMENT_TIPS_FALLBACK: &str = "暂无管理建议";
pub const THINKING_PATTERNS_FALLBACK: &str = "暂无思维模式分析";
pub const COGNITIVE_BIASES_FALLBACK: &str = "暂无认知偏差分析";

/// The three editable parts of a day's journal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JournalSections {
    #[serde(default)]
    pub reflection: String,
    #[serde(default)]
    pub emotion: String,
    #[serde(default)]
    pub mindfulness: String,
}

impl JournalSections {
    /// Read the stored `content` column. Legacy plain-text entries become the
    /// reflection section.
    pub fn from_stored(content: &str) -> Self {
        serde_json::from_str(content).unwrap_or_else(|_| Self {
            reflection: content.to_string(),
            ..Self::default()
        })
    }

    pub fn to_stored(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.reflection.clone())
    }

    /// Text handed to the journal analysis.
    pub fn analysis_input(&self) -> String {
        [&self.reflection, &self.emotion, &self.mindfulness]
            .iter()
            .map(|section| section.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn is_blank(&self) -> bool {
        self.analysis_input().trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JournalEntry {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub content: String,
}

impl JournalEntry {
    pub fn sections(&self) -> JournalSections {
        JournalSections::from_stored(&self.content)
    }
}

/// Result of analysing one journal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JournalInsight {
    pub emotional_state: String,
    pub emotion_cause: String,
    pub management_tips: String,
    pub thinking_patterns: String,
    pub cognitive_biases: String,
    pub action_suggestions: Vec<String>,
    pub mindfulness_tips: Vec<String>,
}

impl JournalInsight {
    /// Fill every gap so the record is complete: blank scalars get their
    /// "暂无…" placeholder, short lists are topped up from the default lists.
    pub fn with_fallbacks(mut self) -> Self {
        fill_blank(&mut self.emotional_state, EMOTIONAL_STATE_FALLBACK);
        fill_blank(&mut self.emotion_cause, EMOTION_CAUSE_FALLBACK);
        fill_blank(&mut self.management_tips, MANAGEMENT_TIPS_FALLBACK);
        fill_blank(&mut self.thinking_patterns, THINKING_PATTERNS_FALLBACK);
        fill_blank(&mut self.cognitive_biases, COGNITIVE_BIASES_FALLBACK);
        top_up(&mut self.action_suggestions, &DEFAULT_ACTION_SUGGESTIONS);
        top_up(&mut self.mindfulness_tips, &DEFAULT_MINDFULNESS_TIPS);
        self
    }

    /// Positional view: 5 scalars, then 4 action items, then 2 mindfulness
    /// items. Kept for callers that still destructure by index.
    pub fn to_flat(&self) -> Vec<String> {
        let mut flat = Vec::with_capacity(FLAT_INSIGHT_LEN);
        flat.extend([
            self.emotional_state.clone(),
            self.emotion_cause.clone(),
            self.management_tips.clone(),
            self.thinking_patterns.clone(),
            self.cognitive_biases.clone(),
        ]);
        flat.extend(self.action_suggestions.iter().cloned());
        flat.extend(self.mindfulness_tips.iter().cloned());
        flat
    }

    pub fn into_record(
        self,
        journal_id: impl Into<String>,
        user_id: impl Into<String>,
        date: NaiveDate,
    ) -> JournalInsightRecord {
        JournalInsightRecord {
            journal_id: journal_id.into(),
            user_id: user_id.into(),
            date,
            insight: self,
        }
    }
}

/// Insight row keyed by its journal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JournalInsightRecord {
    pub journal_id: String,
    pub user_id: String,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub insight: JournalInsight,
}

fn fill_blank(field: &mut String, fallback: &str) {
    if field.trim().is_empty() {
        *field = fallback.to_string();
    }
}

fn top_up(items: &mut Vec<String>, defaults: &[&str]) {
    items.truncate(defaults.len());
    let missing = defaults.len() - items.len();
    if missing == 0 {
        return;
    }
    if items.is_empty() {
        items.extend(defaults.iter().map(|item| item.to_string()));
    } else {
        let extra: Vec<String> = defaults
            .iter()
            .filter(|item| !items.iter().any(|existing| existing == **item))
            .take(missing)
            .map(|item| item.to_string())
            .collect();
        items.extend(extra);
    }
}
