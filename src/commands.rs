use serde::{Deserialize, Serialize};

use crate::date::{parse_date_key, YearMonth};
use crate::events::StatePayload;
use crate::gateway::TaskGateway;
use crate::models::{OverallStats, SubtaskId, TaskId};
use crate::store::TaskStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

fn parse_date(input: &str) -> Result<chrono::NaiveDate, String> {
    parse_date_key(input).ok_or_else(|| format!("invalid date: {}", input.trim()))
}

/// A user action as a front end sends it, e.g. `{"command":"toggle_task","task_id":3}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Reload,
    CreateTask {
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        date: Option<String>,
    },
    ToggleTask {
        task_id: TaskId,
    },
    DeleteTask {
        task_id: TaskId,
    },
    RescheduleTask {
        task_id: TaskId,
        date: String,
    },
    AddSubtask {
        task_id: TaskId,
        title: String,
    },
    ToggleSubtask {
        subtask_id: SubtaskId,
    },
    DeleteSubtask {
        subtask_id: SubtaskId,
    },
    ToggleCollapse {
        task_id: TaskId,
    },
    SelectDate {
        date: String,
    },
    ShowAll,
    NavigateMonth {
        delta: i32,
    },
    JumpToMonth {
        year: i32,
        month: u32,
    },
    JumpToToday,
    OverallStats,
}

pub async fn load_state<G: TaskGateway>(store: &TaskStore<G>) -> CommandResult<StatePayload> {
    match store.load().await {
        Ok(_) => ok(store.snapshot()),
        Err(error) => err(&format!("tasks unavailable: {error}")),
    }
}

/// Returns the new task id so the caller can go straight to adding subtasks.
pub async fn create_task<G: TaskGateway>(
    store: &TaskStore<G>,
    title: &str,
    description: &str,
    date: Option<&str>,
) -> CommandResult<TaskId> {
    if title.trim().is_empty() {
        return err("title is required");
    }
    let explicit = match date.filter(|value| !value.trim().is_empty()) {
        Some(value) => match parse_date(value) {
            Ok(date) => Some(date),
            Err(message) => return err(&message),
        },
        None => None,
    };
    match store.create_task(title, description, explicit).await {
        Some(task_id) => ok(task_id),
        None => err("failed to create task"),
    }
}

pub async fn toggle_task<G: TaskGateway>(store: &TaskStore<G>, task_id: TaskId) -> CommandResult<bool> {
    if store.toggle_task(task_id).await {
        ok(true)
    } else {
        err("failed to update task")
    }
}

pub async fn delete_task<G: TaskGateway>(store: &TaskStore<G>, task_id: TaskId) -> CommandResult<bool> {
    if store.delete_task(task_id).await {
        ok(true)
    } else {
        err("failed to delete task")
    }
}

pub async fn reschedule_task<G: TaskGateway>(
    store: &TaskStore<G>,
    task_id: TaskId,
    date: &str,
) -> CommandResult<bool> {
    let date = match parse_date(date) {
        Ok(date) => date,
        Err(message) => return err(&message),
    };
    if store.reschedule_task(task_id, date).await {
        ok(true)
    } else {
        err("failed to move task")
    }
}

pub async fn add_subtask<G: TaskGateway>(
    store: &TaskStore<G>,
    task_id: TaskId,
    title: &str,
) -> CommandResult<SubtaskId> {
    if title.trim().is_empty() {
        return err("title is required");
    }
    match store.create_subtask(task_id, title).await {
        Some(subtask_id) => ok(subtask_id),
        None => err("failed to add subtask"),
    }
}

pub async fn toggle_subtask<G: TaskGateway>(
    store: &TaskStore<G>,
    subtask_id: SubtaskId,
) -> CommandResult<bool> {
    if store.toggle_subtask(subtask_id).await {
        ok(true)
    } else {
        err("failed to update subtask")
    }
}

pub async fn delete_subtask<G: TaskGateway>(
    store: &TaskStore<G>,
    subtask_id: SubtaskId,
) -> CommandResult<bool> {
    if store.delete_subtask(subtask_id).await {
        ok(true)
    } else {
        err("failed to delete subtask")
    }
}

/// Returns the new collapsed flag.
pub fn toggle_collapse<G: TaskGateway>(store: &TaskStore<G>, task_id: TaskId) -> CommandResult<bool> {
    match store.toggle_collapse(task_id) {
        Some(collapsed) => ok(collapsed),
        None => err("task not found"),
    }
}

/// Invalid input leaves the view as it was.
pub async fn select_date<G: TaskGateway>(store: &TaskStore<G>, date: &str) -> CommandResult<StatePayload> {
    match parse_date(date) {
        Ok(date) => {
            store.select_date(date).await;
            ok(store.snapshot())
        }
        Err(message) => err(&message),
    }
}

pub fn show_all<G: TaskGateway>(store: &TaskStore<G>) -> CommandResult<StatePayload> {
    store.show_all();
    ok(store.snapshot())
}

pub async fn navigate_month<G: TaskGateway>(store: &TaskStore<G>, delta: i32) -> CommandResult<StatePayload> {
    if !store.navigate_month(delta).await {
        return err("invalid month");
    }
    ok(store.snapshot())
}

pub async fn jump_to_month<G: TaskGateway>(
    store: &TaskStore<G>,
    year: i32,
    month: u32,
) -> CommandResult<StatePayload> {
    let Some(target) = YearMonth::new(year, month) else {
        return err(&format!("invalid month: {year}-{month}"));
    };
    store.jump_to_month(target).await;
    ok(store.snapshot())
}

pub async fn jump_to_today<G: TaskGateway>(store: &TaskStore<G>) -> CommandResult<StatePayload> {
    store.jump_to_today().await;
    ok(store.snapshot())
}

pub async fn overall_stats<G: TaskGateway>(store: &TaskStore<G>) -> CommandResult<OverallStats> {
    match store.overall_stats().await {
        Some(stats) => ok(stats),
        None => err("stats unavailable"),
    }
}

fn to_json<T: Serialize>(result: CommandResult<T>) -> CommandResult<serde_json::Value> {
    let CommandResult { ok: success, data, error } = result;
    match data.map(serde_json::to_value).transpose() {
        Ok(data) => CommandResult {
            ok: success,
            data,
            error,
        },
        Err(error) => err(&format!("failed to encode result: {error}")),
    }
}

/// Runs one command and returns its result as JSON.
pub async fn dispatch<G: TaskGateway>(
    store: &TaskStore<G>,
    command: Command,
) -> CommandResult<serde_json::Value> {
    log::debug!("dispatch: {command:?}");
    match command {
        Command::Reload => to_json(load_state(store).await),
        Command::CreateTask {
            title,
            description,
            date,
        } => to_json(create_task(store, &title, &description, date.as_deref()).await),
        Command::ToggleTask { task_id } => to_json(toggle_task(store, task_id).await),
        Command::DeleteTask { task_id } => to_json(delete_task(store, task_id).await),
        Command::RescheduleTask { task_id, date } => {
            to_json(reschedule_task(store, task_id, &date).await)
        }
        Command::AddSubtask { task_id, title } => to_json(add_subtask(store, task_id, &title).await),
        Command::ToggleSubtask { subtask_id } => to_json(toggle_subtask(store, subtask_id).await),
        Command::DeleteSubtask { subtask_id } => to_json(delete_subtask(store, subtask_id).await),
        Command::ToggleCollapse { task_id } => to_json(toggle_collapse(store, task_id)),
        Command::SelectDate { date } => to_json(select_date(store, &date).await),
        Command::ShowAll => to_json(show_all(store)),
        Command::NavigateMonth { delta } => to_json(navigate_month(store, delta).await),
        Command::JumpToMonth { year, month } => to_json(jump_to_month(store, year, month).await),
        Command::JumpToToday => to_json(jump_to_today(store).await),
        Command::OverallStats => to_json(overall_stats(store).await),
    }
}
