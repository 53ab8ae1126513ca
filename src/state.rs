use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;

use crate::calendar::{month_grid, CalendarIndex};
use crate::date::YearMonth;
use crate::events::StatePayload;
use crate::models::{DateKey, MonthlyStats, Subtask, SubtaskId, Task, TaskId};
use crate::view::{Column, ViewState};

/// The session's copy of the backend data plus everything derived from it.
///
/// Every mutator rebuilds the calendar index and the visible list under the same lock, so
/// readers never observe one without the other.
#[derive(Clone)]
pub struct SessionState {
    inner: Arc<Mutex<SessionData>>,
}

impl SessionState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionData {
                tasks: Vec::new(),
                collapse: HashMap::new(),
                view: ViewState::new(today),
                calendar: CalendarIndex::default(),
                visible: Vec::new(),
                monthly_stats: MonthlyStats::default(),
                first_load_done: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    pub fn task(&self, task_id: TaskId) -> Option<Task> {
        self.lock().tasks.iter().find(|t| t.id == task_id).cloned()
    }

    /// Parent id and current value of a subtask, found by scanning every task.
    pub fn find_subtask(&self, subtask_id: SubtaskId) -> Option<(TaskId, Subtask)> {
        let guard = self.lock();
        guard.tasks.iter().find_map(|task| {
            task.subtask(subtask_id)
                .map(|subtask| (task.id, subtask.clone()))
        })
    }

    pub fn visible(&self) -> Vec<Task> {
        self.lock().visible.clone()
    }

    pub fn column_ids(&self, column: Column) -> Vec<TaskId> {
        column.ids(&self.lock().visible)
    }

    pub fn calendar(&self) -> CalendarIndex {
        self.lock().calendar.clone()
    }

    pub fn view(&self) -> ViewState {
        self.lock().view
    }

    pub fn monthly_stats(&self) -> MonthlyStats {
        self.lock().monthly_stats
    }

    /// Stores stats fetched for `month`; ignored when the calendar has since moved to
    /// another month.
    pub fn set_monthly_stats(&self, month: YearMonth, stats: MonthlyStats) -> bool {
        let mut guard = self.lock();
        if guard.view.displayed_month() != month {
            return false;
        }
        guard.monthly_stats = stats;
        true
    }

    /// Absent entries mean expanded.
    pub fn is_collapsed(&self, task_id: TaskId) -> bool {
        self.lock().collapse.get(&task_id).copied().unwrap_or(false)
    }

    pub fn collapse_entries(&self) -> usize {
        self.lock().collapse.len()
    }

    /// Flips a task row between collapsed and expanded; `None` for unknown tasks.
    pub fn toggle_collapse(&self, task_id: TaskId) -> Option<bool> {
        let mut guard = self.lock();
        if !guard.tasks.iter().any(|t| t.id == task_id) {
            return None;
        }
        let collapsed = !guard.collapse.get(&task_id).copied().unwrap_or(false);
        guard.collapse.insert(task_id, collapsed);
        Some(collapsed)
    }

    pub fn replace_tasks(&self, tasks: Vec<Task>) {
        let mut guard = self.lock();
        guard.tasks = tasks;
        guard.rederive();
    }

    /// Switches the view to `today` the first time it is called in a session. Returns
    /// whether it did.
    pub fn apply_first_load(&self, today: NaiveDate) -> bool {
        let mut guard = self.lock();
        if guard.first_load_done {
            return false;
        }
        guard.first_load_done = true;
        guard.view.select_date(today);
        guard.rederive();
        true
    }

    pub fn add_task(&self, task: Task) {
        let mut guard = self.lock();
        guard.tasks.push(task);
        guard.rederive();
    }

    pub fn flip_task_completion(&self, task_id: TaskId) -> bool {
        let mut guard = self.lock();
        let Some(task) = guard.tasks.iter_mut().find(|t| t.id == task_id) else {
            return false;
        };
        task.completed = !task.completed;
        guard.rederive();
        true
    }

    pub fn set_task_date(&self, task_id: TaskId, task_date: DateKey) -> bool {
        let mut guard = self.lock();
        let Some(task) = guard.tasks.iter_mut().find(|t| t.id == task_id) else {
            return false;
        };
        task.task_date = task_date;
        guard.rederive();
        true
    }

    /// Removes the task and its collapse entry.
    pub fn remove_task(&self, task_id: TaskId) -> bool {
        let mut guard = self.lock();
        let before = guard.tasks.len();
        guard.tasks.retain(|task| task.id != task_id);
        guard.collapse.remove(&task_id);
        let removed = guard.tasks.len() != before;
        guard.rederive();
        removed
    }

    /// Appends to the parent and expands it so the new subtask is visible.
    pub fn push_subtask(&self, task_id: TaskId, subtask: Subtask) -> bool {
        let mut guard = self.lock();
        let Some(task) = guard.tasks.iter_mut().find(|t| t.id == task_id) else {
            return false;
        };
        task.subtasks.push(subtask);
        guard.collapse.insert(task_id, false);
        guard.rederive();
        true
    }

    pub fn flip_subtask_completion(&self, subtask_id: SubtaskId) -> bool {
        let mut guard = self.lock();
        let Some(subtask) = guard
            .tasks
            .iter_mut()
            .flat_map(|task| task.subtasks.iter_mut())
            .find(|s| s.id == subtask_id)
        else {
            return false;
        };
        subtask.completed = !subtask.completed;
        guard.rederive();
        true
    }

    pub fn remove_subtask(&self, subtask_id: SubtaskId) -> bool {
        let mut guard = self.lock();
        let mut removed = false;
        for task in &mut guard.tasks {
            let before = task.subtasks.len();
            task.subtasks.retain(|s| s.id != subtask_id);
            removed |= task.subtasks.len() != before;
        }
        guard.rederive();
        removed
    }

    /// Applies a view transition and re-derives the visible list.
    pub fn update_view<R>(&self, change: impl FnOnce(&mut ViewState) -> R) -> R {
        let mut guard = self.lock();
        let out = change(&mut guard.view);
        guard.rederive();
        out
    }

    pub fn snapshot(&self, today: NaiveDate) -> StatePayload {
        let guard = self.lock();
        let (completed, incomplete): (Vec<Task>, Vec<Task>) =
            guard.visible.iter().cloned().partition(|task| task.completed);
        let mut collapsed: Vec<TaskId> = guard
            .collapse
            .iter()
            .filter(|(_, collapsed)| **collapsed)
            .map(|(id, _)| *id)
            .collect();
        collapsed.sort_unstable();
        StatePayload {
            view: guard.view,
            incomplete,
            completed,
            calendar: month_grid(
                guard.view.displayed_month(),
                today,
                guard.view.selected_date(),
                &guard.calendar,
            ),
            monthly_stats: guard.monthly_stats,
            collapsed,
        }
    }
}

#[derive(Debug)]
struct SessionData {
    tasks: Vec<Task>,
    collapse: HashMap<TaskId, bool>,
    view: ViewState,
    calendar: CalendarIndex,
    visible: Vec<Task>,
    monthly_stats: MonthlyStats,
    first_load_done: bool,
}

impl SessionData {
    fn rederive(&mut self) {
        self.calendar.rebuild(&self.tasks);
        self.visible = self.view.derive_visible(&self.tasks);
    }
}
