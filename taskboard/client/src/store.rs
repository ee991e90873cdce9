use crate::api::{ApiError, TaskApi};
use crate::state::{
    CREATE_TASK_FAILED, DELETE_TASK_FAILED, FETCH_TASKS_FAILED, TOGGLE_TASK_FAILED,
    TaskAction, TaskState, UPDATE_TASK_FAILED,
};
use futures::future::join_all;
use taskboard_core::{StatusFilter, Task, TaskId, TaskInput, TaskQuery, TaskStatus};
use tokio::sync::RwLock;

pub const TITLE_REQUIRED: &str = "Task title is required";
pub const UPDATE_DATA_REQUIRED: &str = "Task data is required for update";

/// Owns a [`TaskState`] and keeps it in step with a [`TaskApi`].
///
/// The state lock is only taken to apply actions, never while a request is in
/// flight, so operations on different tasks may overlap. Whichever result is
/// applied last wins.
pub struct TaskStore<A> {
    api: A,
    state: RwLock<TaskState>,
}

impl<A: TaskApi> TaskStore<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: RwLock::new(TaskState::default()),
        }
    }

    /// A copy of the current state.
    pub async fn snapshot(&self) -> TaskState {
        self.state.read().await.clone()
    }

    /// Applies a synchronous action.
    pub async fn dispatch(&self, action: TaskAction) {
        self.state.write().await.reduce(action);
    }

    pub async fn set_filter(&self, filter: StatusFilter) {
        self.dispatch(TaskAction::SetFilter(filter)).await;
    }

    pub async fn set_search_term(&self, search_term: impl Into<String>) {
        self.dispatch(TaskAction::SetSearchTerm(search_term.into()))
            .await;
    }

    pub async fn clear_filters(&self) {
        self.dispatch(TaskAction::ClearFilters).await;
    }

    pub async fn clear_error(&self) {
        self.dispatch(TaskAction::ClearError).await;
    }

    pub async fn reset(&self) {
        self.dispatch(TaskAction::Reset).await;
    }

    /// Replaces the working set with the server's whole collection.
    ///
    /// Filtering and search stay client-side through [`TaskStore::set_filter`]
    /// and [`TaskStore::set_search_term`], so stats recomputed after later
    /// mutations still cover every task.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_tasks(&self) -> Result<(), ApiError> {
        self.dispatch(TaskAction::FetchTasksPending).await;
        match self.api.list_tasks(&TaskQuery::default()).await {
            Ok(list) => {
                tracing::debug!("Fetched {} tasks", list.tasks.len());
                self.dispatch(TaskAction::FetchTasksFulfilled(list)).await;
                Ok(())
            }
            Err(e) => {
                self.reject(TaskAction::FetchTasksRejected, FETCH_TASKS_FAILED, &e)
                    .await;
                Err(e)
            }
        }
    }

    /// Fetches one task without touching the state.
    pub async fn get_task(&self, id: TaskId) -> Result<Task, ApiError> {
        self.api.get_task(id).await
    }

    /// Creates a task from `input`; the title is required and sent trimmed.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(&self, input: &TaskInput) -> Result<Task, ApiError> {
        self.dispatch(TaskAction::CreateTaskPending).await;
        let result = match prepare_new_task(input) {
            Ok(payload) => self.api.create_task(&payload).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(task) => {
                self.dispatch(TaskAction::CreateTaskFulfilled(task.clone()))
                    .await;
                Ok(task)
            }
            Err(e) => {
                self.reject(TaskAction::CreateTaskRejected, CREATE_TASK_FAILED, &e)
                    .await;
                Err(e)
            }
        }
    }

    /// Sends a partial update; at least one field must be given.
    #[tracing::instrument(skip(self))]
    pub async fn update_task(&self, id: TaskId, input: &TaskInput) -> Result<Task, ApiError> {
        self.dispatch(TaskAction::UpdateTaskPending).await;
        let result = match prepare_changes(input) {
            Ok(payload) => self.api.update_task(id, &payload).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(task) => {
                self.dispatch(TaskAction::UpdateTaskFulfilled(task.clone()))
                    .await;
                Ok(task)
            }
            Err(e) => {
                self.reject(TaskAction::UpdateTaskRejected, UPDATE_TASK_FAILED, &e)
                    .await;
                Err(e)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&self, id: TaskId) -> Result<Task, ApiError> {
        self.dispatch(TaskAction::DeleteTaskPending).await;
        match self.api.delete_task(id).await {
            Ok(task) => {
                self.dispatch(TaskAction::DeleteTaskFulfilled(id)).await;
                Ok(task)
            }
            Err(e) => {
                self.reject(TaskAction::DeleteTaskRejected, DELETE_TASK_FAILED, &e)
                    .await;
                Err(e)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn toggle_task_status(&self, id: TaskId) -> Result<Task, ApiError> {
        self.dispatch(TaskAction::ToggleTaskStatusPending).await;
        match self.api.toggle_task_status(id).await {
            Ok(task) => {
                self.dispatch(TaskAction::ToggleTaskStatusFulfilled(task.clone()))
                    .await;
                Ok(task)
            }
            Err(e) => {
                self.reject(TaskAction::ToggleTaskStatusRejected, TOGGLE_TASK_FAILED, &e)
                    .await;
                Err(e)
            }
        }
    }

    /// Deletes every task in `ids` concurrently.
    ///
    /// Returns one result per id, in the order given; a failure for one id does
    /// not stop the others.
    pub async fn delete_tasks(&self, ids: &[TaskId]) -> Vec<Result<Task, ApiError>> {
        join_all(ids.iter().map(|&id| self.delete_task(id))).await
    }

    /// Sets `status` on every task in `ids` concurrently, with the same
    /// per-id results as [`TaskStore::delete_tasks`].
    pub async fn set_status_for(
        &self,
        ids: &[TaskId],
        status: TaskStatus,
    ) -> Vec<Result<Task, ApiError>> {
        let input = TaskInput::new(None, Some(status));
        join_all(ids.iter().map(|&id| self.update_task(id, &input))).await
    }

    async fn reject(
        &self,
        action: impl FnOnce(String) -> TaskAction,
        fallback: &str,
        error: &ApiError,
    ) {
        let message = error.user_message(fallback);
        tracing::warn!("{}: {}", fallback, error);
        self.dispatch(action(message)).await;
    }
}

fn prepare_new_task(input: &TaskInput) -> Result<TaskInput, ApiError> {
    let title = input
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .ok_or_else(|| ApiError::InvalidInput(TITLE_REQUIRED.to_string()))?;
    Ok(TaskInput {
        title: Some(title.to_string()),
        status: input.status.clone(),
    })
}

fn prepare_changes(input: &TaskInput) -> Result<TaskInput, ApiError> {
    if input.title.is_none() && input.status.is_none() {
        return Err(ApiError::InvalidInput(UPDATE_DATA_REQUIRED.to_string()));
    }
    Ok(TaskInput {
        title: input.title.as_deref().map(|title| title.trim().to_string()),
        status: input.status.clone(),
    })
}
