use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::config::Language;
use crate::date::{format_date_key, YearMonth};
use crate::models::{DateKey, Task};

/// Six weeks of seven days.
pub const GRID_CELLS: usize = 42;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DayAggregate {
    pub date_key: DateKey,
    pub total: u32,
    pub completed: u32,
}

impl DayAggregate {
    pub fn status(&self) -> Option<DayStatus> {
        if self.total == 0 {
            return None;
        }
        Some(if self.completed >= self.total {
            DayStatus::AllDone
        } else if self.completed > 0 {
            DayStatus::Partial
        } else {
            DayStatus::NoneDone
        })
    }
}

/// Day marker shown on the calendar for days that have tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    AllDone,
    Partial,
    NoneDone,
}

/// Per-day `{total, completed}` counts keyed by the tasks' own `task_date`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalendarIndex {
    days: HashMap<DateKey, DayAggregate>,
}

impl CalendarIndex {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut index = Self::default();
        index.rebuild(tasks);
        index
    }

    /// Recomputes from scratch. Malformed date keys are grouped under their literal value.
    pub fn rebuild(&mut self, tasks: &[Task]) {
        self.days.clear();
        for task in tasks {
            let day = self
                .days
                .entry(task.task_date.clone())
                .or_insert_with(|| DayAggregate {
                    date_key: task.task_date.clone(),
                    total: 0,
                    completed: 0,
                });
            day.total += 1;
            if task.completed {
                day.completed += 1;
            }
        }
    }

    pub fn get(&self, date_key: &str) -> Option<&DayAggregate> {
        self.days.get(date_key)
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayAggregate> {
        self.get(&format_date_key(date))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub date_key: DateKey,
    pub in_month: bool,
    pub is_today: bool,
    pub is_selected: bool,
    pub status: Option<DayStatus>,
}

/// Cells for a Sunday-first month view, padded with the neighbouring months' days.
pub fn month_grid(
    month: YearMonth,
    today: NaiveDate,
    selected: Option<NaiveDate>,
    index: &CalendarIndex,
) -> Vec<CalendarCell> {
    let first = month.first_day();
    let start = first - Duration::days(i64::from(first.weekday().num_days_from_sunday()));

    (0..GRID_CELLS as i64)
        .map(|offset| {
            let date = start + Duration::days(offset);
            let date_key = format_date_key(date);
            let status = index.get(&date_key).and_then(DayAggregate::status);
            CalendarCell {
                date,
                in_month: month.contains(date),
                is_today: date == today,
                is_selected: selected == Some(date),
                status,
                date_key,
            }
        })
        .collect()
}

pub fn month_title(month: YearMonth, language: Language) -> String {
    match language {
        Language::Zh => format!("{}年{}月", month.year(), month.month()),
        Language::En => month.first_day().format("%B %Y").to_string(),
    }
}
