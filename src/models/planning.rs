use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::task::{Priority, TodoScheduleUpdate};

/// One time block assigned by the planner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledTask {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(rename = "estimated_time")]
    pub estimated_time_minutes: u32,
    pub priority: Priority,
}

impl ScheduledTask {
    pub fn to_update(&self) -> TodoScheduleUpdate {
        TodoScheduleUpdate {
            id: self.id.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            estimated_time: self.estimated_time_minutes,
        }
    }
}

/// Validated planner answer. Every `end_time` is at or after its `start_time`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleProposal {
    pub tasks: Vec<ScheduledTask>,
    pub suggestion: String,
    pub planning_logic: String,
}
