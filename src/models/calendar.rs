use chrono::NaiveDate;
use serde::Serialize;

use crate::models::journal::{JournalEntry, JournalInsightRecord};
use crate::models::task::TodoRecord;

/// Everything the calendar shows for one day.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub tasks: Vec<TodoRecord>,
    pub journal: Option<JournalEntry>,
    pub insight: Option<JournalInsightRecord>,
}

impl CalendarDay {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.journal.is_none() && self.insight.is_none()
    }
}
