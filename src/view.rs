use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::date::{format_date_key, YearMonth};
use crate::models::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "date", rename_all = "snake_case")]
pub enum ViewMode {
    All,
    ByDate(NaiveDate),
}

/// Which tasks are listed and which month the calendar shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ViewState {
    mode: ViewMode,
    displayed_month: YearMonth,
}

impl ViewState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            mode: ViewMode::ByDate(today),
            displayed_month: YearMonth::of(today),
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn displayed_month(&self) -> YearMonth {
        self.displayed_month
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        match self.mode {
            ViewMode::All => None,
            ViewMode::ByDate(date) => Some(date),
        }
    }

    /// Filters by `date`, bringing its month into view. Returns true when the displayed
    /// month moved.
    pub fn select_date(&mut self, date: NaiveDate) -> bool {
        self.mode = ViewMode::ByDate(date);
        if self.displayed_month.contains(date) {
            return false;
        }
        self.displayed_month = YearMonth::of(date);
        true
    }

    pub fn show_all(&mut self) {
        self.mode = ViewMode::All;
    }

    /// Calendar-only navigation; the task filter is untouched. Returns false and leaves
    /// the month as it was when the target month is out of range.
    pub fn navigate_month(&mut self, delta: i32) -> bool {
        match self.displayed_month.shift(delta) {
            Some(month) => {
                self.displayed_month = month;
                true
            }
            None => false,
        }
    }

    pub fn jump_to_month(&mut self, month: YearMonth) {
        self.displayed_month = month;
    }

    pub fn jump_to_today(&mut self, today: NaiveDate) {
        self.mode = ViewMode::ByDate(today);
        self.displayed_month = YearMonth::of(today);
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self.mode {
            ViewMode::All => true,
            ViewMode::ByDate(date) => task.task_date == format_date_key(date),
        }
    }

    /// Visible subsequence of `tasks`, in collection order.
    pub fn derive_visible(&self, tasks: &[Task]) -> Vec<Task> {
        match self.mode {
            ViewMode::All => tasks.to_vec(),
            ViewMode::ByDate(date) => {
                let key = format_date_key(date);
                tasks
                    .iter()
                    .filter(|task| task.task_date == key)
                    .cloned()
                    .collect()
            }
        }
    }
}

/// A view chosen up front, e.g. from command-line flags. `all` wins over `date`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewRequest {
    pub all: bool,
    pub date: Option<NaiveDate>,
    pub month: Option<YearMonth>,
}

/// The two rendered lists a visible task can land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Incomplete,
    Completed,
}

impl Column {
    pub fn of(task: &Task) -> Self {
        if task.completed {
            Column::Completed
        } else {
            Column::Incomplete
        }
    }

    pub fn ids(self, visible: &[Task]) -> Vec<i64> {
        visible
            .iter()
            .filter(|task| Column::of(task) == self)
            .map(|task| task.id)
            .collect()
    }
}
