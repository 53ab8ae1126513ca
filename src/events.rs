use serde::Serialize;

use crate::calendar::CalendarCell;
use crate::models::{MonthlyStats, Task, TaskId};
use crate::view::ViewState;

/// Everything a renderer needs to repaint after a committed change.
#[derive(Debug, Clone, Serialize)]
pub struct StatePayload {
    pub view: ViewState,
    pub incomplete: Vec<Task>,
    pub completed: Vec<Task>,
    pub calendar: Vec<CalendarCell>,
    pub monthly_stats: MonthlyStats,
    pub collapsed: Vec<TaskId>,
}

impl StatePayload {
    pub fn visible_len(&self) -> usize {
        self.incomplete.len() + self.completed.len()
    }
}

pub trait StateListener: Send + Sync {
    fn state_updated(&self, payload: &StatePayload);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl StateListener for NoopListener {
    fn state_updated(&self, _payload: &StatePayload) {}
}
