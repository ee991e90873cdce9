use crate::entities::*;
use sea_orm::sea_query::{Expr, Order};
use sea_orm::*;
use std::sync::Arc;
use taskboard_core::{
    InvalidTaskId, SortField, SortOrder, Task, TaskId, TaskInput, TaskQuery, TaskStats,
    TaskStatus, ValidationErrors, timestamp_now,
};

pub mod api;

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// One or more input fields failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    /// No task exists with the given ID.
    #[error("Task with ID {0} not found")]
    NotFound(TaskId),
    /// The ID is not in the store's identifier format.
    #[error(transparent)]
    InvalidIdentifier(#[from] InvalidTaskId),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    /// A stored row could not be read back as a task.
    #[error("Stored task {id} is malformed: {reason}")]
    CorruptRecord { id: String, reason: String },
}

/// Shared state for the task routes.
pub struct TaskRouterState {
    pub db: Arc<DatabaseConnection>,
    /// Include internal error details in 500 responses.
    pub expose_error_details: bool,
}

/// Tasks matching a listing query plus counts over the whole collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListing {
    pub tasks: Vec<Task>,
    pub stats: TaskStats,
}

impl TryFrom<task::Model> for Task {
    type Error = TaskServiceError;

    fn try_from(model: task::Model) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| TaskServiceError::CorruptRecord {
            id: model.id.clone(),
            reason,
        };
        let id = model.id.parse::<TaskId>().map_err(|e| corrupt(e.to_string()))?;
        let status = model
            .status
            .parse::<TaskStatus>()
            .map_err(|e| corrupt(e.to_string()))?;
        Ok(Task {
            id,
            title: model.title,
            status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

fn sort_column(field: SortField) -> task::Column {
    match field {
        SortField::CreatedAt => task::Column::CreatedAt,
        SortField::UpdatedAt => task::Column::UpdatedAt,
        SortField::Title => task::Column::Title,
        SortField::Status => task::Column::Status,
    }
}

fn sort_order(order: SortOrder) -> Order {
    match order {
        SortOrder::Asc => Order::Asc,
        SortOrder::Desc => Order::Desc,
    }
}

pub struct TaskService<'a> {
    db: &'a DatabaseConnection,
}

impl TaskService<'_> {
    pub fn new(db: &DatabaseConnection) -> TaskService<'_> {
        TaskService { db }
    }

    /// Lists tasks matching the query's status filter and title search, ordered by
    /// the requested field.
    ///
    /// The returned stats always describe the entire collection, not just the
    /// matching tasks.
    #[tracing::instrument(skip(self))]
    pub async fn list_tasks(&self, query: &TaskQuery) -> Result<TaskListing, TaskServiceError> {
        let mut select = task::Entity::find();
        if let Some(status) = query.status.and_then(|filter| filter.status()) {
            select = select.filter(task::Column::Status.eq(status.as_str()));
        }

        let models = select
            .order_by(
                sort_column(query.sort_by.unwrap_or_default()),
                sort_order(query.sort_order.unwrap_or_default()),
            )
            .all(self.db)
            .await?;

        let filter = query.filter();
        let mut tasks = Vec::with_capacity(models.len());
        for model in models {
            let task = Task::try_from(model)?;
            if filter.matches(&task) {
                tasks.push(task);
            }
        }

        let stats = self.get_stats().await?;
        Ok(TaskListing { tasks, stats })
    }

    /// Retrieves a task by its ID.
    ///
    /// # Arguments
    ///
    /// * `id` - The task ID as supplied by the caller.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Task` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn get_task_by_id(&self, id: &str) -> Result<Task, TaskServiceError> {
        let id = id.parse::<TaskId>()?;
        let model = self.find_model(id).await?;
        Task::try_from(model)
    }

    /// Creates a new task.
    ///
    /// The title is trimmed and must be 1 to 200 characters; the status defaults
    /// to `Pending`. Nothing is stored when validation fails.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(&self, input: &TaskInput) -> Result<Task, TaskServiceError> {
        let new_task = input.validate_new()?;
        let task = Task::new(new_task.title, new_task.status, timestamp_now());

        let active_model = task::ActiveModel {
            id: ActiveValue::Set(task.id.to_string()),
            title: ActiveValue::Set(task.title.clone()),
            status: ActiveValue::Set(task.status.as_str().to_string()),
            created_at: ActiveValue::Set(task.created_at),
            updated_at: ActiveValue::Set(task.updated_at),
        };
        let created_model = active_model.insert(self.db).await?;
        tracing::info!("Created task {}", task.id);
        Task::try_from(created_model)
    }

    /// Applies a partial update to a task.
    ///
    /// Omitted fields are left unchanged. The task is only written, and
    /// `updatedAt` only refreshed, when a value actually differs.
    #[tracing::instrument(skip(self))]
    pub async fn update_task(
        &self,
        id: &str,
        input: &TaskInput,
    ) -> Result<Task, TaskServiceError> {
        let id = id.parse::<TaskId>()?;
        let changes = input.validate_changes()?;
        let model = self.find_model(id).await?;

        let mut task = Task::try_from(model.clone())?;
        if !task.apply(&changes, timestamp_now()) {
            tracing::debug!("Update of task {} changed nothing", id);
            return Ok(task);
        }
        self.save(model, &task).await
    }

    /// Deletes a task permanently, returning its last state.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&self, id: &str) -> Result<Task, TaskServiceError> {
        let id = id.parse::<TaskId>()?;
        let model = self.find_model(id).await?;
        let deleted = Task::try_from(model)?;

        let result = task::Entity::delete_by_id(id.to_string())
            .exec(self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(TaskServiceError::NotFound(id));
        }
        tracing::info!("Deleted task {}", id);
        Ok(deleted)
    }

    /// Flips a task between `Pending` and `Completed`.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_task_status(&self, id: &str) -> Result<Task, TaskServiceError> {
        let id = id.parse::<TaskId>()?;
        let model = self.find_model(id).await?;

        let mut task = Task::try_from(model.clone())?;
        task.toggle(timestamp_now());
        self.save(model, &task).await
    }

    /// Counts tasks per status over the whole collection.
    #[tracing::instrument(skip(self))]
    pub async fn get_stats(&self) -> Result<TaskStats, TaskServiceError> {
        let counts: Vec<(String, i64)> = task::Entity::find()
            .select_only()
            .column(task::Column::Status)
            .column_as(Expr::col(task::Column::Id).count(), "count")
            .group_by(task::Column::Status)
            .into_tuple()
            .all(self.db)
            .await?;

        let (mut pending, mut completed) = (0, 0);
        for (status, count) in counts {
            match status.parse::<TaskStatus>() {
                Ok(TaskStatus::Pending) => pending = count as u64,
                Ok(TaskStatus::Completed) => completed = count as u64,
                Err(e) => tracing::warn!("Ignoring {} tasks: {}", count, e),
            }
        }
        Ok(TaskStats::from_counts(pending, completed))
    }

    async fn find_model(&self, id: TaskId) -> Result<task::Model, TaskServiceError> {
        task::Entity::find_by_id(id.to_string())
            .one(self.db)
            .await?
            .ok_or(TaskServiceError::NotFound(id))
    }

    async fn save(&self, model: task::Model, task: &Task) -> Result<Task, TaskServiceError> {
        let mut active_model: task::ActiveModel = model.into();
        active_model.title = ActiveValue::Set(task.title.clone());
        active_model.status = ActiveValue::Set(task.status.as_str().to_string());
        active_model.updated_at = ActiveValue::Set(task.updated_at);

        let updated_model = match active_model.update(self.db).await {
            Ok(updated_model) => updated_model,
            // Deleted between the read and the write.
            Err(DbErr::RecordNotUpdated) => return Err(TaskServiceError::NotFound(task.id)),
            Err(e) => return Err(e.into()),
        };
        Task::try_from(updated_model)
    }
}
