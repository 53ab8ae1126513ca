use std::sync::Arc;

use chrono::NaiveDate;

use crate::date::{format_date_key, Clock, LocalClock, YearMonth};
use crate::events::{NoopListener, StateListener, StatePayload};
use crate::gateway::{GatewayError, TaskGateway};
use crate::models::{
    MonthlyStats, NewSubtask, NewTask, OverallStats, SubtaskId, SubtaskPatch, TaskId, TaskPatch,
};
use crate::state::SessionState;
use crate::view::ViewRequest;

/// Owns the session state and runs every mutation remote-first: the backend is asked
/// first and the local copy changes only after it confirms. A failed call is logged and
/// leaves the local copy exactly as it was.
pub struct TaskStore<G> {
    gateway: G,
    state: SessionState,
    clock: Arc<dyn Clock>,
    listener: Arc<dyn StateListener>,
}

impl<G: TaskGateway> TaskStore<G> {
    pub fn new(gateway: G) -> Self {
        Self::with_clock(gateway, Arc::new(LocalClock))
    }

    pub fn with_clock(gateway: G, clock: Arc<dyn Clock>) -> Self {
        Self {
            gateway,
            state: SessionState::new(clock.today()),
            clock,
            listener: Arc::new(NoopListener),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn StateListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn snapshot(&self) -> StatePayload {
        self.state.snapshot(self.today())
    }

    /// Replaces the local tasks with the backend's list. On failure the list is emptied
    /// and the error returned so the caller can show an "unavailable" state.
    pub async fn load(&self) -> Result<usize, GatewayError> {
        match self.gateway.list_tasks().await {
            Ok(tasks) => {
                let count = tasks.len();
                self.state.replace_tasks(tasks);
                if self.state.apply_first_load(self.today()) {
                    log::info!("load: first load, showing today's tasks");
                }
                log::debug!("load: {count} tasks");
                self.commit().await;
                Ok(count)
            }
            Err(err) => {
                log::warn!("load: tasks unavailable: {err}");
                self.state.replace_tasks(Vec::new());
                self.commit().await;
                Err(err)
            }
        }
    }

    /// Creates a task on `explicit_date`, else the selected day, else today. Returns the
    /// server-assigned id.
    pub async fn create_task(
        &self,
        title: &str,
        description: &str,
        explicit_date: Option<NaiveDate>,
    ) -> Option<TaskId> {
        let title = title.trim();
        if title.is_empty() {
            log::debug!("create_task: ignoring empty title");
            return None;
        }
        let date = explicit_date
            .or_else(|| self.state.view().selected_date())
            .unwrap_or_else(|| self.today());
        let request = NewTask {
            title: title.to_string(),
            description: description.to_string(),
            task_date: format_date_key(date),
        };

        match self.gateway.create_task(&request).await {
            Ok(task) => {
                let task_id = task.id;
                self.state.add_task(task);
                log::debug!("create_task: created id={task_id} date={}", request.task_date);
                self.commit().await;
                Some(task_id)
            }
            Err(err) => {
                log::warn!("create_task: failed: {err}");
                None
            }
        }
    }

    pub async fn toggle_task(&self, task_id: TaskId) -> bool {
        let Some(task) = self.state.task(task_id) else {
            return false;
        };
        let patch = TaskPatch::completion(!task.completed);
        if let Err(err) = self.gateway.update_task(task_id, &patch).await {
            log::warn!("toggle_task: id={task_id} failed: {err}");
            return false;
        }
        if !self.state.flip_task_completion(task_id) {
            return false;
        }
        self.commit().await;
        true
    }

    pub async fn toggle_subtask(&self, subtask_id: SubtaskId) -> bool {
        let Some((_, subtask)) = self.state.find_subtask(subtask_id) else {
            return false;
        };
        let patch = SubtaskPatch {
            completed: Some(!subtask.completed),
            ..SubtaskPatch::default()
        };
        if let Err(err) = self.gateway.update_subtask(subtask_id, &patch).await {
            log::warn!("toggle_subtask: id={subtask_id} failed: {err}");
            return false;
        }
        if !self.state.flip_subtask_completion(subtask_id) {
            return false;
        }
        self.commit().await;
        true
    }

    pub async fn delete_task(&self, task_id: TaskId) -> bool {
        if let Err(err) = self.gateway.delete_task(task_id).await {
            log::warn!("delete_task: id={task_id} failed: {err}");
            return false;
        }
        self.state.remove_task(task_id);
        self.commit().await;
        true
    }

    /// Adds a subtask and expands its parent. Returns the new subtask id.
    pub async fn create_subtask(&self, task_id: TaskId, title: &str) -> Option<SubtaskId> {
        let title = title.trim();
        if title.is_empty() {
            log::debug!("create_subtask: ignoring empty title");
            return None;
        }
        let request = NewSubtask {
            title: title.to_string(),
        };
        let subtask = match self.gateway.create_subtask(task_id, &request).await {
            Ok(subtask) => subtask,
            Err(err) => {
                log::warn!("create_subtask: parent={task_id} failed: {err}");
                return None;
            }
        };
        let subtask_id = subtask.id;
        if !self.state.push_subtask(task_id, subtask) {
            log::warn!("create_subtask: parent={task_id} no longer in the local list");
            return None;
        }
        self.commit().await;
        Some(subtask_id)
    }

    pub async fn delete_subtask(&self, subtask_id: SubtaskId) -> bool {
        if let Err(err) = self.gateway.delete_subtask(subtask_id).await {
            log::warn!("delete_subtask: id={subtask_id} failed: {err}");
            return false;
        }
        self.state.remove_subtask(subtask_id);
        self.commit().await;
        true
    }

    /// Moves a task to another day.
    pub async fn reschedule_task(&self, task_id: TaskId, date: NaiveDate) -> bool {
        if self.state.task(task_id).is_none() {
            return false;
        }
        let date_key = format_date_key(date);
        let patch = TaskPatch::reschedule(date_key.clone());
        if let Err(err) = self.gateway.update_task(task_id, &patch).await {
            log::warn!("reschedule_task: id={task_id} failed: {err}");
            return false;
        }
        if !self.state.set_task_date(task_id, date_key) {
            return false;
        }
        self.commit().await;
        true
    }

    /// Local only; no backend call.
    pub fn toggle_collapse(&self, task_id: TaskId) -> Option<bool> {
        let collapsed = self.state.toggle_collapse(task_id)?;
        self.notify();
        Some(collapsed)
    }

    pub fn is_collapsed(&self, task_id: TaskId) -> bool {
        self.state.is_collapsed(task_id)
    }

    /// Filters the list by `date`; stats are refetched only when the month changes.
    pub async fn select_date(&self, date: NaiveDate) {
        let month_moved = self.state.update_view(|view| view.select_date(date));
        if month_moved {
            self.refresh_monthly_stats().await;
        }
        self.notify();
    }

    pub fn show_all(&self) {
        self.state.update_view(|view| view.show_all());
        self.notify();
    }

    /// Returns false, without refreshing, when the target month is out of range.
    pub async fn navigate_month(&self, delta: i32) -> bool {
        if !self.state.update_view(|view| view.navigate_month(delta)) {
            log::debug!("navigate_month: delta {delta} out of range");
            return false;
        }
        self.refresh_monthly_stats().await;
        self.notify();
        true
    }

    pub async fn jump_to_month(&self, month: YearMonth) {
        self.state.update_view(|view| view.jump_to_month(month));
        self.refresh_monthly_stats().await;
        self.notify();
    }

    /// Applies a requested view. Run it before any action that depends on the selected day.
    pub async fn apply_view(&self, request: ViewRequest) {
        if request.all {
            self.show_all();
        } else if let Some(date) = request.date {
            self.select_date(date).await;
        }
        if let Some(month) = request.month {
            self.jump_to_month(month).await;
        }
    }

    pub async fn jump_to_today(&self) {
        let today = self.today();
        self.state.update_view(|view| view.jump_to_today(today));
        self.refresh_monthly_stats().await;
        self.notify();
    }

    pub async fn overall_stats(&self) -> Option<OverallStats> {
        match self.gateway.overall_stats().await {
            Ok(stats) => Some(stats),
            Err(err) => {
                log::warn!("overall_stats: failed: {err}");
                None
            }
        }
    }

    /// Runs after every confirmed change. The state mutator already rebuilt the calendar
    /// index and the visible list; this adds the stats widget and repaints.
    async fn commit(&self) {
        self.refresh_monthly_stats().await;
        self.notify();
    }

    async fn refresh_monthly_stats(&self) {
        let month = self.state.view().displayed_month();
        let stats = match self.gateway.monthly_stats(month).await {
            Ok(stats) => stats,
            Err(err) => {
                log::warn!(
                    "monthly_stats: {}-{:02} unavailable: {err}",
                    month.year(),
                    month.month()
                );
                MonthlyStats::default()
            }
        };
        self.state.set_monthly_stats(month, stats);
    }

    fn notify(&self) {
        let payload = self.snapshot();
        self.listener.state_updated(&payload);
    }
}
