//! In-memory doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::NaiveDate;

use crate::date::YearMonth;
use crate::events::{StateListener, StatePayload};
use crate::gateway::{GatewayError, TaskGateway};
use crate::models::{
    MonthlyStats, NewSubtask, NewTask, OverallStats, Subtask, SubtaskId, SubtaskPatch, Task,
    TaskId, TaskPatch,
};

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_task(id: TaskId, date: &str, completed: bool) -> Task {
    Task {
        id,
        title: format!("task-{id}"),
        description: String::new(),
        task_date: date.to_string(),
        completed,
        subtasks: Vec::new(),
    }
}

/// Backend double that behaves like the real API: ids are assigned server-side and the
/// list comes back sorted by the stored order.
#[derive(Default)]
pub struct FakeGateway {
    inner: Mutex<FakeBackend>,
}

#[derive(Default)]
struct FakeBackend {
    tasks: Vec<Task>,
    order: HashMap<TaskId, usize>,
    next_id: i64,
    failing: HashSet<&'static str>,
    calls: Vec<String>,
}

impl FakeBackend {
    fn enter(&mut self, op: &'static str) -> Result<(), GatewayError> {
        self.calls.push(op.to_string());
        if self.failing.contains(op) {
            return Err(GatewayError::Transport(format!("{op}: connection refused")));
        }
        Ok(())
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn task_mut(&mut self, task_id: TaskId) -> Result<&mut Task, GatewayError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| GatewayError::NotFound(format!("task {task_id}")))
    }

    fn subtask_mut(&mut self, subtask_id: SubtaskId) -> Result<&mut Subtask, GatewayError> {
        self.tasks
            .iter_mut()
            .flat_map(|t| t.subtasks.iter_mut())
            .find(|s| s.id == subtask_id)
            .ok_or_else(|| GatewayError::NotFound(format!("subtask {subtask_id}")))
    }
}

impl FakeGateway {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let next_id = tasks
            .iter()
            .flat_map(|t| std::iter::once(t.id).chain(t.subtasks.iter().map(|s| s.id)))
            .max()
            .unwrap_or(0);
        let order = tasks.iter().enumerate().map(|(i, t)| (t.id, i)).collect();
        Self {
            inner: Mutex::new(FakeBackend {
                tasks,
                order,
                next_id,
                ..FakeBackend::default()
            }),
        }
    }

    /// Makes every later call of `op` fail with a transport error.
    pub fn fail(&self, op: &'static str) {
        self.inner.lock().unwrap().failing.insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.inner.lock().unwrap().failing.remove(op);
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == op).count()
    }

    pub fn backend_task(&self, task_id: TaskId) -> Option<Task> {
        let guard = self.inner.lock().unwrap();
        guard.tasks.iter().find(|t| t.id == task_id).cloned()
    }

    /// Deletes a task behind the client's back.
    pub fn drop_task(&self, task_id: TaskId) {
        self.inner.lock().unwrap().tasks.retain(|t| t.id != task_id);
    }
}

impl TaskGateway for FakeGateway {
    async fn list_tasks(&self) -> Result<Vec<Task>, GatewayError> {
        let mut guard = self.inner.lock().unwrap();
        guard.enter("list_tasks")?;
        let mut tasks = guard.tasks.clone();
        tasks.sort_by_key(|t| guard.order.get(&t.id).copied().unwrap_or(usize::MAX));
        Ok(tasks)
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, GatewayError> {
        let mut guard = self.inner.lock().unwrap();
        guard.enter("create_task")?;
        if task.title.trim().is_empty() {
            return Err(GatewayError::Validation("empty title".to_string()));
        }
        let id = guard.next_id();
        let created = Task {
            id,
            title: task.title.clone(),
            description: task.description.clone(),
            task_date: task.task_date.clone(),
            completed: false,
            subtasks: Vec::new(),
        };
        let position = guard.tasks.len();
        guard.order.insert(id, position);
        guard.tasks.push(created.clone());
        Ok(created)
    }

    async fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> Result<(), GatewayError> {
        let mut guard = self.inner.lock().unwrap();
        guard.enter("update_task")?;
        let task = guard.task_mut(task_id)?;
        if let Some(title) = &patch.title {
            task.title = title.clone();
        }
        if let Some(description) = &patch.description {
            task.description = description.clone();
        }
        if let Some(completed) = patch.completed {
            task.completed = completed;
        }
        if let Some(task_date) = &patch.task_date {
            task.task_date = task_date.clone();
        }
        Ok(())
    }

    async fn delete_task(&self, task_id: TaskId) -> Result<(), GatewayError> {
        let mut guard = self.inner.lock().unwrap();
        guard.enter("delete_task")?;
        guard.task_mut(task_id)?;
        guard.tasks.retain(|t| t.id != task_id);
        guard.order.remove(&task_id);
        Ok(())
    }

    async fn create_subtask(
        &self,
        task_id: TaskId,
        subtask: &NewSubtask,
    ) -> Result<Subtask, GatewayError> {
        let mut guard = self.inner.lock().unwrap();
        guard.enter("create_subtask")?;
        let id = guard.next_id();
        let created = Subtask {
            id,
            title: subtask.title.clone(),
            completed: false,
        };
        guard.task_mut(task_id)?.subtasks.push(created.clone());
        Ok(created)
    }

    async fn update_subtask(
        &self,
        subtask_id: SubtaskId,
        patch: &SubtaskPatch,
    ) -> Result<(), GatewayError> {
        let mut guard = self.inner.lock().unwrap();
        guard.enter("update_subtask")?;
        let subtask = guard.subtask_mut(subtask_id)?;
        if let Some(completed) = patch.completed {
            subtask.completed = completed;
        }
        if let Some(title) = &patch.title {
            subtask.title = title.clone();
        }
        Ok(())
    }

    async fn delete_subtask(&self, subtask_id: SubtaskId) -> Result<(), GatewayError> {
        let mut guard = self.inner.lock().unwrap();
        guard.enter("delete_subtask")?;
        guard.subtask_mut(subtask_id)?;
        for task in &mut guard.tasks {
            task.subtasks.retain(|s| s.id != subtask_id);
        }
        Ok(())
    }

    async fn reorder_tasks(&self, task_ids: &[TaskId]) -> Result<(), GatewayError> {
        let mut guard = self.inner.lock().unwrap();
        guard.enter("reorder_tasks")?;
        for (index, task_id) in task_ids.iter().enumerate() {
            if guard.order.contains_key(task_id) {
                guard.order.insert(*task_id, index);
            }
        }
        Ok(())
    }

    async fn reorder_subtasks(
        &self,
        task_id: TaskId,
        subtask_ids: &[SubtaskId],
    ) -> Result<(), GatewayError> {
        let mut guard = self.inner.lock().unwrap();
        guard.enter("reorder_subtasks")?;
        let task = guard.task_mut(task_id)?;
        task.subtasks.sort_by_key(|s| {
            subtask_ids
                .iter()
                .position(|id| *id == s.id)
                .unwrap_or(usize::MAX)
        });
        Ok(())
    }

    async fn monthly_stats(&self, month: YearMonth) -> Result<MonthlyStats, GatewayError> {
        let mut guard = self.inner.lock().unwrap();
        guard.enter("monthly_stats")?;
        let prefix = format!("{:04}-{:02}-", month.year(), month.month());
        let in_month: Vec<&Task> = guard
            .tasks
            .iter()
            .filter(|t| t.task_date.starts_with(&prefix))
            .collect();
        Ok(MonthlyStats {
            total_tasks: in_month.len() as u32,
            completed_tasks: in_month.iter().filter(|t| t.completed).count() as u32,
        })
    }

    async fn overall_stats(&self) -> Result<OverallStats, GatewayError> {
        let mut guard = self.inner.lock().unwrap();
        guard.enter("overall_stats")?;
        let total = guard.tasks.len() as u32;
        let completed = guard.tasks.iter().filter(|t| t.completed).count() as u32;
        Ok(OverallStats {
            total_tasks: total,
            completed_tasks: completed,
            completion_percentage: if total == 0 {
                0.0
            } else {
                f64::from(completed) / f64::from(total) * 100.0
            },
        })
    }
}

#[derive(Default)]
pub struct RecordingListener {
    payloads: Mutex<Vec<StatePayload>>,
}

impl RecordingListener {
    pub fn count(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<StatePayload> {
        self.payloads.lock().unwrap().last().cloned()
    }
}

impl StateListener for RecordingListener {
    fn state_updated(&self, payload: &StatePayload) {
        self.payloads.lock().unwrap().push(payload.clone());
    }
}
