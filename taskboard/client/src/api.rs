//! Access to the task API.
//!
//! [`TaskApi`] is the seam between the store and the network; [`HttpTaskApi`]
//! is the implementation that talks JSON over HTTP to the task server.

use crate::config::ClientConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use taskboard_core::{Task, TaskId, TaskInput, TaskQuery, TaskStats};
use thiserror::Error;

/// Errors returned by task API calls.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("Request failed with status {status}")]
    Api {
        status: u16,
        /// The `message` field of the server's error body, when it had one.
        message: Option<String>,
    },
    /// The request never produced a usable response.
    #[error("Network error - please check your connection")]
    Transport(#[from] reqwest::Error),
    /// The server answered with success but the body was not the expected JSON.
    #[error("Unexpected response body with status {status}: {source}")]
    InvalidResponse {
        status: u16,
        #[source]
        source: reqwest::Error,
    },
    /// The call was refused before anything was sent.
    #[error("{0}")]
    InvalidInput(String),
}

impl ApiError {
    /// The message to show a user: the server's own message when there is one,
    /// the precondition message for refused input, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Api {
                message: Some(message),
                ..
            } => message.clone(),
            ApiError::InvalidInput(message) => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// Result of a listing call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskList {
    pub tasks: Vec<Task>,
    /// Collection-wide counts, if the server sent them.
    pub stats: Option<TaskStats>,
}

/// Operations the client performs against the task server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Lists tasks matching `query`.
    async fn list_tasks(&self, query: &TaskQuery) -> Result<TaskList, ApiError>;

    /// Fetches a single task.
    async fn get_task(&self, id: TaskId) -> Result<Task, ApiError>;

    /// Creates a task and returns it as stored.
    async fn create_task(&self, input: &TaskInput) -> Result<Task, ApiError>;

    /// Applies a partial update and returns the task as stored.
    async fn update_task(&self, id: TaskId, input: &TaskInput) -> Result<Task, ApiError>;

    /// Deletes a task and returns its last state.
    async fn delete_task(&self, id: TaskId) -> Result<Task, ApiError>;

    /// Flips a task's status and returns the task as stored.
    async fn toggle_task_status(&self, id: TaskId) -> Result<Task, ApiError>;
}

#[derive(Deserialize)]
struct ListEnvelope {
    #[serde(default)]
    data: Vec<Task>,
    #[serde(default)]
    stats: Option<TaskStats>,
}

#[derive(Deserialize)]
struct TaskEnvelope {
    data: Task,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: Option<String>,
}

/// [`TaskApi`] over HTTP with `reqwest`.
#[derive(Clone, Debug)]
pub struct HttpTaskApi {
    client: Client,
    base_url: String,
}

impl HttpTaskApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn task_url(&self, id: TaskId) -> String {
        self.url(&format!("/tasks/{}", id))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await.map_err(|e| {
            tracing::error!("Task API request failed: {}", e);
            ApiError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|source| {
                tracing::error!("Task API sent an unreadable body: {}", source);
                ApiError::InvalidResponse {
                    status: status.as_u16(),
                    source,
                }
            });
        }

        let message = response
            .json::<ErrorEnvelope>()
            .await
            .ok()
            .and_then(|body| body.message);
        tracing::warn!(
            "Task API responded with {}: {}",
            status,
            message.as_deref().unwrap_or("<no message>")
        );
        Err(ApiError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_task(&self, request: RequestBuilder) -> Result<Task, ApiError> {
        let envelope: TaskEnvelope = self.send(request).await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    #[tracing::instrument(skip(self))]
    async fn list_tasks(&self, query: &TaskQuery) -> Result<TaskList, ApiError> {
        let request = self
            .client
            .get(self.url("/tasks"))
            .query(&query.to_pairs());
        let envelope: ListEnvelope = self.send(request).await?;
        Ok(TaskList {
            tasks: envelope.data,
            stats: envelope.stats,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn get_task(&self, id: TaskId) -> Result<Task, ApiError> {
        self.send_task(self.client.get(self.task_url(id))).await
    }

    #[tracing::instrument(skip(self))]
    async fn create_task(&self, input: &TaskInput) -> Result<Task, ApiError> {
        self.send_task(self.client.post(self.url("/tasks")).json(input))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn update_task(&self, id: TaskId, input: &TaskInput) -> Result<Task, ApiError> {
        self.send_task(self.client.put(self.task_url(id)).json(input))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_task(&self, id: TaskId) -> Result<Task, ApiError> {
        self.send_task(self.client.delete(self.task_url(id))).await
    }

    #[tracing::instrument(skip(self))]
    async fn toggle_task_status(&self, id: TaskId) -> Result<Task, ApiError> {
        let url = format!("{}/toggle", self.task_url(id));
        self.send_task(self.client.patch(url)).await
    }
}
