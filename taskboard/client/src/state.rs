//! Client-side mirror of the task collection.
//!
//! All transitions go through [`TaskState::reduce`], which is pure: given the
//! same state and action it always produces the same next state.

use crate::api::TaskList;
use taskboard_core::{StatusFilter, Task, TaskFilter, TaskId, TaskStats};

pub const FETCH_TASKS_FAILED: &str = "Failed to fetch tasks";
pub const CREATE_TASK_FAILED: &str = "Failed to create task";
pub const UPDATE_TASK_FAILED: &str = "Failed to update task";
pub const DELETE_TASK_FAILED: &str = "Failed to delete task";
pub const TOGGLE_TASK_FAILED: &str = "Failed to toggle task status";

/// Everything that can happen to the client state.
///
/// Each remote operation reports `*Pending` when it starts and exactly one of
/// `*Fulfilled` or `*Rejected` when it settles. Rejections carry the message to
/// show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    FetchTasksPending,
    FetchTasksFulfilled(TaskList),
    FetchTasksRejected(String),
    CreateTaskPending,
    CreateTaskFulfilled(Task),
    CreateTaskRejected(String),
    UpdateTaskPending,
    UpdateTaskFulfilled(Task),
    UpdateTaskRejected(String),
    DeleteTaskPending,
    DeleteTaskFulfilled(TaskId),
    DeleteTaskRejected(String),
    ToggleTaskStatusPending,
    ToggleTaskStatusFulfilled(Task),
    ToggleTaskStatusRejected(String),
    SetFilter(StatusFilter),
    SetSearchTerm(String),
    ClearFilters,
    ClearError,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskState {
    tasks: Vec<Task>,
    filtered_tasks: Vec<Task>,
    filter: StatusFilter,
    search_term: String,
    loading: bool,
    error: Option<String>,
    stats: TaskStats,
}

impl TaskState {
    /// Applies `action` to the state.
    pub fn reduce(&mut self, action: TaskAction) {
        match action {
            TaskAction::FetchTasksPending | TaskAction::CreateTaskPending => {
                self.loading = true;
                self.error = None;
            }
            TaskAction::UpdateTaskPending
            | TaskAction::DeleteTaskPending
            | TaskAction::ToggleTaskStatusPending => {
                self.error = None;
            }
            TaskAction::FetchTasksFulfilled(list) => {
                self.loading = false;
                self.stats = list
                    .stats
                    .unwrap_or_else(|| TaskStats::from_tasks(&list.tasks));
                self.tasks = list.tasks;
                self.refresh_view();
            }
            TaskAction::CreateTaskFulfilled(task) => {
                self.loading = false;
                self.tasks.insert(0, task);
                self.refresh();
            }
            TaskAction::UpdateTaskFulfilled(task) | TaskAction::ToggleTaskStatusFulfilled(task) => {
                if let Some(existing) = self.tasks.iter_mut().find(|t| t.id == task.id) {
                    *existing = task;
                    self.refresh();
                }
            }
            TaskAction::DeleteTaskFulfilled(id) => {
                self.tasks.retain(|task| task.id != id);
                self.refresh();
            }
            TaskAction::FetchTasksRejected(message)
            | TaskAction::CreateTaskRejected(message)
            | TaskAction::UpdateTaskRejected(message)
            | TaskAction::DeleteTaskRejected(message)
            | TaskAction::ToggleTaskStatusRejected(message) => {
                self.loading = false;
                self.error = Some(message);
            }
            TaskAction::SetFilter(filter) => {
                self.filter = filter;
                self.refresh_view();
            }
            TaskAction::SetSearchTerm(search_term) => {
                self.search_term = search_term;
                self.refresh_view();
            }
            TaskAction::ClearFilters => {
                self.filter = StatusFilter::All;
                self.search_term.clear();
                self.filtered_tasks = self.tasks.clone();
            }
            TaskAction::ClearError => self.error = None,
            TaskAction::Reset => *self = TaskState::default(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// The working set narrowed by the current filter and search term.
    pub fn filtered_tasks(&self) -> &[Task] {
        &self.filtered_tasks
    }

    pub fn filter(&self) -> StatusFilter {
        self.filter
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn stats(&self) -> TaskStats {
        self.stats
    }

    fn refresh(&mut self) {
        self.stats = TaskStats::from_tasks(&self.tasks);
        self.refresh_view();
    }

    fn refresh_view(&mut self) {
        self.filtered_tasks =
            TaskFilter::new(self.filter, self.search_term.clone()).apply(&self.tasks);
    }
}
