//! The REST boundary to the task backend. No business logic lives here: each call is one
//! request/response pair and fails independently of every other call.

use std::future::Future;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::date::YearMonth;
use crate::models::{
    MonthlyStats, NewSubtask, NewTask, OverallStats, Subtask, SubtaskId, SubtaskPatch, Task,
    TaskId, TaskPatch,
};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Network failure, timeout, or an unusable HTTP client.
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rejected input: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        GatewayError::Transport(value.to_string())
    }
}

pub trait TaskGateway: Send + Sync {
    /// Any failure means "list unavailable", never "list empty".
    fn list_tasks(&self) -> impl Future<Output = Result<Vec<Task>, GatewayError>> + Send;

    fn create_task(&self, task: &NewTask)
        -> impl Future<Output = Result<Task, GatewayError>> + Send;

    fn update_task(
        &self,
        task_id: TaskId,
        patch: &TaskPatch,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    fn delete_task(&self, task_id: TaskId)
        -> impl Future<Output = Result<(), GatewayError>> + Send;

    fn create_subtask(
        &self,
        task_id: TaskId,
        subtask: &NewSubtask,
    ) -> impl Future<Output = Result<Subtask, GatewayError>> + Send;

    fn update_subtask(
        &self,
        subtask_id: SubtaskId,
        patch: &SubtaskPatch,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    fn delete_subtask(
        &self,
        subtask_id: SubtaskId,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Submits the full order of the ids currently shown in one list.
    fn reorder_tasks(
        &self,
        task_ids: &[TaskId],
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    fn reorder_subtasks(
        &self,
        task_id: TaskId,
        subtask_ids: &[SubtaskId],
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    fn monthly_stats(
        &self,
        month: YearMonth,
    ) -> impl Future<Output = Result<MonthlyStats, GatewayError>> + Send;

    fn overall_stats(&self) -> impl Future<Output = Result<OverallStats, GatewayError>> + Send;
}

/// `TaskGateway` over the backend's JSON API.
#[derive(Debug, Clone)]
pub struct RestGateway {
    client: Client,
    base_url: String,
}

impl RestGateway {
    pub fn new(config: &ClientConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| GatewayError::Transport(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, GatewayError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            return Ok(body);
        }
        Err(match status {
            StatusCode::NOT_FOUND => GatewayError::NotFound(body),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                GatewayError::Validation(body)
            }
            other => GatewayError::Http {
                status: other.as_u16(),
                body,
            },
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        let body = self.send(request).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn require_title(title: &str) -> Result<(), GatewayError> {
    if title.trim().is_empty() {
        return Err(GatewayError::Validation("title must not be empty".to_string()));
    }
    Ok(())
}

impl TaskGateway for RestGateway {
    async fn list_tasks(&self) -> Result<Vec<Task>, GatewayError> {
        self.send_json(self.client.get(self.url("/api/tasks"))).await
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, GatewayError> {
        require_title(&task.title)?;
        self.send_json(self.client.post(self.url("/api/tasks")).json(task))
            .await
    }

    async fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> Result<(), GatewayError> {
        let url = self.url(&format!("/api/tasks/{task_id}"));
        self.send(self.client.put(url).json(patch)).await.map(|_| ())
    }

    async fn delete_task(&self, task_id: TaskId) -> Result<(), GatewayError> {
        let url = self.url(&format!("/api/tasks/{task_id}"));
        self.send(self.client.delete(url)).await.map(|_| ())
    }

    async fn create_subtask(
        &self,
        task_id: TaskId,
        subtask: &NewSubtask,
    ) -> Result<Subtask, GatewayError> {
        require_title(&subtask.title)?;
        let url = self.url(&format!("/api/tasks/{task_id}/subtasks"));
        self.send_json(self.client.post(url).json(subtask)).await
    }

    async fn update_subtask(
        &self,
        subtask_id: SubtaskId,
        patch: &SubtaskPatch,
    ) -> Result<(), GatewayError> {
        let url = self.url(&format!("/api/subtasks/{subtask_id}"));
        self.send(self.client.put(url).json(patch)).await.map(|_| ())
    }

    async fn delete_subtask(&self, subtask_id: SubtaskId) -> Result<(), GatewayError> {
        let url = self.url(&format!("/api/subtasks/{subtask_id}"));
        self.send(self.client.delete(url)).await.map(|_| ())
    }

    async fn reorder_tasks(&self, task_ids: &[TaskId]) -> Result<(), GatewayError> {
        let url = self.url("/api/tasks/reorder");
        self.send(self.client.put(url).json(task_ids)).await.map(|_| ())
    }

    async fn reorder_subtasks(
        &self,
        task_id: TaskId,
        subtask_ids: &[SubtaskId],
    ) -> Result<(), GatewayError> {
        let url = self.url(&format!("/api/tasks/{task_id}/subtasks/reorder"));
        self.send(self.client.put(url).json(subtask_ids))
            .await
            .map(|_| ())
    }

    async fn monthly_stats(&self, month: YearMonth) -> Result<MonthlyStats, GatewayError> {
        let url = self.url(&format!(
            "/api/stats/monthly?year={}&month={}",
            month.year(),
            month.month()
        ));
        self.send_json(self.client.get(url)).await
    }

    async fn overall_stats(&self) -> Result<OverallStats, GatewayError> {
        self.send_json(self.client.get(self.url("/api/stats"))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_trimmed_of_trailing_slashes() {
        let config = ClientConfig {
            base_url: " http://127.0.0.1:8000/ ".to_string(),
            ..ClientConfig::default()
        };
        let gateway = RestGateway::new(&config).unwrap();
        assert_eq!(gateway.base_url(), "http://127.0.0.1:8000");
        assert_eq!(gateway.url("/api/tasks"), "http://127.0.0.1:8000/api/tasks");
    }

    #[test]
    fn blank_titles_are_rejected_before_sending() {
        assert!(matches!(
            require_title("  "),
            Err(GatewayError::Validation(_))
        ));
        assert!(require_title("buy milk").is_ok());
    }

    #[tokio::test]
    async fn create_task_with_empty_title_never_reaches_the_network() {
        // Nothing listens on port 9; a request would surface as a transport error.
        let config = ClientConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 1,
            ..ClientConfig::default()
        };
        let gateway = RestGateway::new(&config).unwrap();
        let task = NewTask {
            title: String::new(),
            description: String::new(),
            task_date: "2024-05-01".to_string(),
        };
        let result = gateway.create_task(&task).await;
        assert!(matches!(result, Err(GatewayError::Validation(_))));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let config = ClientConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 1,
            ..ClientConfig::default()
        };
        let gateway = RestGateway::new(&config).unwrap();
        let result = gateway.list_tasks().await;
        assert!(matches!(result, Err(GatewayError::Transport(_))));
    }
}
