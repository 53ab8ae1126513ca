use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub type TaskId = i64;
pub type SubtaskId = i64;

/// `YYYY-MM-DD` string binding a task to a calendar day. Kept as received from the
/// backend so malformed values still group and compare.
pub type DateKey = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Subtask {
    pub id: SubtaskId,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "deserialize_lenient_string")]
    pub task_date: DateKey,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, deserialize_with = "deserialize_subtasks")]
    pub subtasks: Vec<Subtask>,
}

impl Task {
    pub fn subtask(&self, subtask_id: SubtaskId) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == subtask_id)
    }
}

/// Body of `POST /api/tasks`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub task_date: DateKey,
}

/// Body of `POST /api/tasks/{id}/subtasks`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct NewSubtask {
    pub title: String,
}

/// Partial body of `PUT /api/tasks/{id}`; unset fields are left untouched server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_date: Option<DateKey>,
}

impl TaskPatch {
    pub fn completion(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn reschedule(task_date: DateKey) -> Self {
        Self {
            task_date: Some(task_date),
            ..Self::default()
        }
    }
}

/// Body of `PUT /api/subtasks/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct SubtaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct MonthlyStats {
    #[serde(default)]
    pub total_tasks: u32,
    #[serde(default)]
    pub completed_tasks: u32,
}

impl MonthlyStats {
    /// Whole-percent completion; 0 for a month without tasks.
    pub fn completion_rate(&self) -> u32 {
        if self.total_tasks == 0 {
            return 0;
        }
        let rate = f64::from(self.completed_tasks) / f64::from(self.total_tasks) * 100.0;
        rate.round() as u32
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct OverallStats {
    #[serde(default)]
    pub total_tasks: u32,
    #[serde(default)]
    pub completed_tasks: u32,
    #[serde(default)]
    pub completion_percentage: f64,
}

fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn deserialize_subtasks<'de, D>(deserializer: D) -> Result<Vec<Subtask>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<Subtask>(item).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_missing_optional_fields_get_defaults() {
        let json = r#"{ "id": 7, "title": "write report", "task_date": "2024-05-01" }"#;
        let task: Task = serde_json::from_str(json).expect("task should deserialize");
        assert_eq!(task.id, 7);
        assert_eq!(task.description, "");
        assert!(!task.completed);
        assert!(task.subtasks.is_empty());
    }

    #[test]
    fn task_null_subtasks_and_description_are_normalized() {
        let json = r#"
        {
          "id": 1,
          "title": "t",
          "description": null,
          "task_date": "2024-05-01",
          "completed": true,
          "subtasks": null,
          "created_at": "2024-05-01T08:00:00",
          "order_index": 3
        }
        "#;
        let task: Task = serde_json::from_str(json).expect("task should deserialize");
        assert_eq!(task.description, "");
        assert!(task.completed);
        assert!(task.subtasks.is_empty());
    }

    #[test]
    fn malformed_subtask_entries_are_skipped() {
        let json = r#"
        {
          "id": 1,
          "title": "t",
          "task_date": "2024-05-01",
          "subtasks": [
            { "id": 10, "title": "a", "completed": true, "parent_task_id": 1 },
            "garbage",
            { "title": "missing id" }
          ]
        }
        "#;
        let task: Task = serde_json::from_str(json).expect("task should deserialize");
        assert_eq!(task.subtasks.len(), 1);
        assert_eq!(task.subtask(10).map(|s| s.completed), Some(true));
        assert!(task.subtask(11).is_none());
    }

    #[test]
    fn non_string_task_date_keeps_its_literal_value() {
        let json = r#"{ "id": 1, "title": "t", "task_date": 20240501 }"#;
        let task: Task = serde_json::from_str(json).expect("task should deserialize");
        assert_eq!(task.task_date, "20240501");
    }

    #[test]
    fn task_patch_only_serializes_set_fields() {
        let value = serde_json::to_value(TaskPatch::completion(true)).expect("serialize patch");
        assert_eq!(value, serde_json::json!({ "completed": true }));

        let value = serde_json::to_value(TaskPatch::reschedule("2024-06-02".to_string()))
            .expect("serialize patch");
        assert_eq!(value, serde_json::json!({ "task_date": "2024-06-02" }));
    }

    #[test]
    fn monthly_stats_completion_rate_rounds_and_handles_empty_month() {
        assert_eq!(MonthlyStats::default().completion_rate(), 0);
        let stats = MonthlyStats {
            total_tasks: 3,
            completed_tasks: 2,
        };
        assert_eq!(stats.completion_rate(), 67);

        // Extra backend fields (year/month/percentage) are ignored.
        let stats: MonthlyStats = serde_json::from_str(
            r#"{ "year": 2024, "month": 5, "total_tasks": 4, "completed_tasks": 1, "completion_percentage": 25.0 }"#,
        )
        .expect("stats should deserialize");
        assert_eq!(stats.completion_rate(), 25);
    }
}
