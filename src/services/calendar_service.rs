use chrono::{Datelike, Months, NaiveDate};

use crate::error::{AppError, AppResult};
use crate::models::calendar::CalendarDay;
use crate::models::journal::{JournalEntry, JournalInsightRecord};
use crate::models::task::TodoRecord;
use crate::services::schedule_utils::parse_calendar_date;

pub fn first_of_month(anchor: NaiveDate) -> AppResult<NaiveDate> {
    anchor
        .with_day(1)
        .ok_or_else(|| AppError::validation("无效的日期"))
}

/// Every day of `anchor`'s month, in order.
pub fn month_days(anchor: NaiveDate) -> AppResult<Vec<NaiveDate>> {
    let start = first_of_month(anchor)?;
    let next = start
        .checked_add_months(Months::new(1))
        .ok_or_else(|| AppError::validation("日期超出范围"))?;
    Ok(start.iter_days().take_while(|day| *day < next).collect())
}

/// Same day-of-month `delta` months away, clamped to the target month's end.
pub fn shift_month(anchor: NaiveDate, delta: i32) -> AppResult<NaiveDate> {
    let months = Months::new(delta.unsigned_abs());
    let shifted = if delta >= 0 {
        anchor.checked_add_months(months)
    } else {
        anchor.checked_sub_months(months)
    };
    shifted.ok_or_else(|| AppError::validation("日期超出范围"))
}

/// One cell per day of the month holding the tasks due that day, the day's
/// journal and its insight.
pub fn build_month_view(
    anchor: NaiveDate,
    tasks: &[TodoRecord],
    journals: &[JournalEntry],
    insights: &[JournalInsightRecord],
) -> AppResult<Vec<CalendarDay>> {
    let days = month_days(anchor)?;

    Ok(days
        .into_iter()
        .map(|date| {
            let day_tasks = tasks
                .iter()
                .filter(|task| {
                    task.due_date
                        .as_deref()
                        .and_then(parse_calendar_date)
                        .map(|due| due == date)
                        .unwrap_or(false)
                })
                .cloned()
                .collect();

            let journal = journals.iter().find(|entry| entry.date == date).cloned();
            let insight = match &journal {
                Some(entry) => insights
                    .iter()
                    .find(|insight| insight.journal_id == entry.id)
                    .cloned(),
                None => insights.iter().find(|insight| insight.date == date).cloned(),
            };

            CalendarDay {
                date,
                tasks: day_tasks,
                journal,
                insight,
            }
        })
        .collect())
}
