use crate::task::{TaskListing, TaskRouterState, TaskService, TaskServiceError};
use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use taskboard_core::{
    FieldError, SortField, SortOrder, StatusFilter, Task, TaskInput, TaskQuery, TaskStats,
    ValidationErrors, timestamp_now,
};
use utoipa::{IntoParams, ToSchema};

/// JSON representation of a Task for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskJson {
    /// Unique identifier for the task
    id: String,
    /// Task title, 1 to 200 characters
    title: String,
    /// Either `Pending` or `Completed`
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// Whole days since the task was created
    age: i64,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            age: task.age_days(timestamp_now()),
            id: task.id.to_string(),
            title: task.title,
            status: task.status.as_str().to_string(),
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Task counts over the whole collection.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsJson {
    total: u64,
    pending: u64,
    completed: u64,
}

impl From<TaskStats> for StatsJson {
    fn from(stats: TaskStats) -> Self {
        Self {
            total: stats.total,
            pending: stats.pending,
            completed: stats.completed,
        }
    }
}

/// API response for listing tasks.
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskListResponse {
    success: bool,
    /// Number of tasks in `data`
    count: usize,
    stats: StatsJson,
    data: Vec<TaskJson>,
}

impl From<TaskListing> for TaskListResponse {
    fn from(listing: TaskListing) -> Self {
        let data: Vec<TaskJson> = listing.tasks.into_iter().map(TaskJson::from).collect();
        Self {
            success: true,
            count: data.len(),
            stats: listing.stats.into(),
            data,
        }
    }
}

/// API response carrying a single task.
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    data: TaskJson,
}

impl TaskResponse {
    fn new(task: Task) -> Self {
        Self {
            success: true,
            message: None,
            data: task.into(),
        }
    }

    fn with_message(task: Task, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: task.into(),
        }
    }
}

/// Field-level validation failure.
#[derive(Debug, Serialize, ToSchema)]
pub struct FieldErrorJson {
    field: String,
    message: String,
}

impl From<FieldError> for FieldErrorJson {
    fn from(error: FieldError) -> Self {
        Self {
            field: error.field,
            message: error.message,
        }
    }
}

/// JSON response for failed task operations.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldErrorJson>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ErrorResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: None,
            error: None,
        }
    }

    fn validation(errors: ValidationErrors) -> Self {
        Self {
            errors: Some(errors.into_fields().into_iter().map(Into::into).collect()),
            ..Self::new("Validation failed")
        }
    }

    fn internal(message: &str, detail: String) -> Self {
        Self {
            error: Some(detail),
            ..Self::new(message)
        }
    }
}

/// Request body for creating or updating a task.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskRequest {
    /// Required when creating; optional when updating
    #[serde(default)]
    title: Option<String>,
    /// `Pending` or `Completed`
    #[serde(default)]
    status: Option<String>,
}

impl From<TaskRequest> for TaskInput {
    fn from(request: TaskRequest) -> Self {
        TaskInput {
            title: request.title,
            status: request.status,
        }
    }
}

/// Query parameters for listing tasks.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListTasksQuery {
    /// `All`, `Pending` or `Completed`
    status: Option<String>,
    /// Case-insensitive title search
    search: Option<String>,
    /// `createdAt` (default), `updatedAt`, `title` or `status`
    sort_by: Option<String>,
    /// `asc` or `desc` (default)
    sort_order: Option<String>,
}

impl ListTasksQuery {
    /// Converts raw query values into a typed query; blank values count as absent.
    ///
    /// Returns `None` when `status` names no status at all, since such a filter
    /// matches no task. An unknown `sortBy` falls back to the default field and
    /// any `sortOrder` other than `asc` means descending.
    fn into_task_query(self) -> Option<TaskQuery> {
        let status = match present(self.status) {
            Some(raw) => Some(raw.parse::<StatusFilter>().ok()?),
            None => None,
        };
        let sort_by = present(self.sort_by).and_then(|raw| raw.parse::<SortField>().ok());
        let sort_order = present(self.sort_order).map(|raw| match raw.as_str() {
            "asc" => SortOrder::Asc,
            _ => SortOrder::Desc,
        });
        Some(TaskQuery {
            status,
            search: present(self.search),
            sort_by,
            sort_order,
        })
    }
}

fn present(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Failure of a task endpoint, rendered as a JSON error body.
#[derive(Debug)]
pub struct TaskApiError {
    /// Message used when the failure is internal, e.g. "Failed to fetch tasks".
    failure_message: &'static str,
    expose_details: bool,
    error: TaskServiceError,
}

impl TaskApiError {
    fn handler(
        expose_details: bool,
        failure_message: &'static str,
    ) -> impl FnOnce(TaskServiceError) -> TaskApiError {
        move |error| TaskApiError {
            failure_message,
            expose_details,
            error,
        }
    }
}

impl IntoResponse for TaskApiError {
    fn into_response(self) -> Response {
        let (status_code, body) = match self.error {
            TaskServiceError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::validation(errors))
            }
            TaskServiceError::NotFound(_) => {
                (StatusCode::NOT_FOUND, ErrorResponse::new("Task not found"))
            }
            TaskServiceError::InvalidIdentifier(_) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("Invalid task ID format"),
            ),
            error => {
                tracing::error!("{}: {}", self.failure_message, error);
                let detail = if self.expose_details {
                    error.to_string()
                } else {
                    "Internal server error".to_string()
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::internal(self.failure_message, detail),
                )
            }
        };
        (status_code, Json(body)).into_response()
    }
}

fn body_error(rejection: JsonRejection) -> TaskServiceError {
    TaskServiceError::Validation(ValidationErrors::single("body", rejection.body_text()))
}

/// Handler for GET /api/tasks - Lists tasks with optional filtering, search and sorting.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/tasks",
    params(ListTasksQuery),
    responses(
        (status = 200, description = "Matching tasks and collection stats", body = TaskListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<TaskRouterState>>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<TaskListResponse>, TaskApiError> {
    let task_service = TaskService::new(&state.db);
    let result = match query.into_task_query() {
        Some(query) => task_service.list_tasks(&query).await,
        None => task_service
            .get_stats()
            .await
            .map(|stats| TaskListing {
                tasks: Vec::new(),
                stats,
            }),
    };
    let listing = result.map_err(TaskApiError::handler(
        state.expose_error_details,
        "Failed to fetch tasks",
    ))?;
    Ok(Json(listing.into()))
}

/// Handler for GET /api/tasks/{id} - Returns a single task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "The task", body = TaskResponse),
        (status = 400, description = "Malformed task ID", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_task_handler(
    State(state): State<Arc<TaskRouterState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, TaskApiError> {
    let task = TaskService::new(&state.db)
        .get_task_by_id(&id)
        .await
        .map_err(TaskApiError::handler(state.expose_error_details, "Failed to fetch task"))?;
    Ok(Json(TaskResponse::new(task)))
}

/// Handler for POST /api/tasks - Creates a task.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = TaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskRouterState>>,
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskResponse>), TaskApiError> {
    let result = match payload {
        Ok(Json(request)) => TaskService::new(&state.db).create_task(&request.into()).await,
        Err(rejection) => Err(body_error(rejection)),
    };
    let task = result.map_err(TaskApiError::handler(
        state.expose_error_details,
        "Failed to create task",
    ))?;
    Ok((
        StatusCode::CREATED,
        Json(TaskResponse::with_message(task, "Task created successfully")),
    ))
}

/// Handler for PUT /api/tasks/{id} - Updates the given fields of a task.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    params(("id" = String, Path, description = "Task ID")),
    request_body = TaskRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskResponse),
        (status = 400, description = "Malformed task ID or validation failed", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskRouterState>>,
    Path(id): Path<String>,
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<Json<TaskResponse>, TaskApiError> {
    let result = match payload {
        Ok(Json(request)) => {
            TaskService::new(&state.db)
                .update_task(&id, &request.into())
                .await
        }
        Err(rejection) => Err(body_error(rejection)),
    };
    let task = result.map_err(TaskApiError::handler(
        state.expose_error_details,
        "Failed to update task",
    ))?;
    Ok(Json(TaskResponse::with_message(
        task,
        "Task updated successfully",
    )))
}

/// Handler for DELETE /api/tasks/{id} - Deletes a task and returns its last state.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task deleted", body = TaskResponse),
        (status = 400, description = "Malformed task ID", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskRouterState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, TaskApiError> {
    let task = TaskService::new(&state.db)
        .delete_task(&id)
        .await
        .map_err(TaskApiError::handler(state.expose_error_details, "Failed to delete task"))?;
    Ok(Json(TaskResponse::with_message(
        task,
        "Task deleted successfully",
    )))
}

/// Handler for PATCH /api/tasks/{id}/toggle - Flips a task between Pending and Completed.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    patch,
    path = "/api/tasks/{id}/toggle",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task status toggled", body = TaskResponse),
        (status = 400, description = "Malformed task ID", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn toggle_task_status_handler(
    State(state): State<Arc<TaskRouterState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, TaskApiError> {
    let task = TaskService::new(&state.db)
        .toggle_task_status(&id)
        .await
        .map_err(TaskApiError::handler(state.expose_error_details, "Failed to toggle task status"))?;
    let message = format!("Task marked as {}", task.status.as_str().to_lowercase());
    Ok(Json(TaskResponse::with_message(task, message)))
}

/// Creates and returns the tasks API router.
pub fn create_api_router(state: Arc<TaskRouterState>) -> Router {
    Router::new()
        .route(
            "/api/tasks",
            get(list_tasks_handler).post(create_task_handler),
        )
        .route(
            "/api/tasks/{id}",
            get(get_task_handler)
                .put(update_task_handler)
                .delete(delete_task_handler),
        )
        .route("/api/tasks/{id}/toggle", patch(toggle_task_status_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(status: &str, search: &str, sort_by: &str, sort_order: &str) -> ListTasksQuery {
        let param = |value: &str| Some(value.to_string());
        ListTasksQuery {
            status: param(status),
            search: param(search),
            sort_by: param(sort_by),
            sort_order: param(sort_order),
        }
    }

    #[test]
    fn blank_query_values_mean_defaults() {
        let parsed = query("", "   ", "", "").into_task_query().unwrap();
        assert_eq!(parsed, TaskQuery::default());
    }

    #[test]
    fn parses_every_supported_value() {
        let parsed = query("Completed", " milk ", "title", "asc")
            .into_task_query()
            .unwrap();
        assert_eq!(parsed.status, Some(StatusFilter::Completed));
        assert_eq!(parsed.search.as_deref(), Some("milk"));
        assert_eq!(parsed.sort_by, Some(SortField::Title));
        assert_eq!(parsed.sort_order, Some(SortOrder::Asc));
    }

    #[test]
    fn unknown_status_matches_nothing() {
        assert_eq!(query("Done", "", "", "").into_task_query(), None);
        assert_eq!(query("pending", "", "", "").into_task_query(), None);
    }

    #[test]
    fn unknown_sort_values_fall_back_to_defaults() {
        let long_search = "x".repeat(150);
        let parsed = query("All", &long_search, "priority", "sideways")
            .into_task_query()
            .unwrap();
        assert_eq!(parsed.status, Some(StatusFilter::All));
        assert_eq!(parsed.search, Some(long_search));
        assert_eq!(parsed.sort_by, None);
        assert_eq!(parsed.sort_order, Some(SortOrder::Desc));
    }

    #[tokio::test]
    async fn hides_internal_error_details_unless_exposed() {
        let error = TaskApiError {
            failure_message: "Failed to fetch tasks",
            expose_details: false,
            error: TaskServiceError::Database(sea_orm::DbErr::Custom("disk full".to_string())),
        };

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "message": "Failed to fetch tasks",
                "error": "Internal server error"
            })
        );
    }

    #[tokio::test]
    async fn exposes_internal_error_details_in_development() {
        let error = TaskApiError {
            failure_message: "Failed to create task",
            expose_details: true,
            error: TaskServiceError::Database(sea_orm::DbErr::Custom("disk full".to_string())),
        };

        let response = error.into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let detail = json["error"].as_str().unwrap();
        assert!(detail.contains("disk full"));
    }
}
