//! Core domain models and rules for Taskboard.
//!
//! Shared by the server (which owns the authoritative task collection) and the
//! client (which mirrors a working set of it), so both sides validate and filter
//! tasks with the same code.
pub mod filter;
pub mod task;
pub mod validation;

pub use filter::{SortField, SortOrder, StatusFilter, TaskFilter, TaskQuery, UnsupportedValue};
pub use task::{InvalidTaskId, Task, TaskId, TaskStats, TaskStatus, UnknownStatus, timestamp_now};
pub use validation::{FieldError, NewTask, TaskChanges, TaskInput, ValidationErrors};
