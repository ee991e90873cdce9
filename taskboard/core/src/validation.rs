//! Input validation for creating and updating tasks.

use crate::task::TaskStatus;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const TITLE_MAX_LENGTH: usize = 200;

pub const TITLE_REQUIRED: &str = "Task title is required";
pub const TITLE_EMPTY: &str = "Task title cannot be empty";
pub const TITLE_TOO_LONG: &str = "Task title cannot exceed 200 characters";
pub const STATUS_INVALID: &str = "Status must be either Pending or Completed";

/// A validation failure attached to one input field.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// One or more field-level validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Validation failed: {}", .0.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; "))]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new(errors: Vec<FieldError>) -> Self {
        ValidationErrors(errors)
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationErrors(vec![FieldError::new(field, message)])
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    pub fn into_fields(self) -> Vec<FieldError> {
        self.0
    }
}

/// Raw, unvalidated task fields as they arrive from a caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TaskInput {
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub title: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub status: Option<String>,
}

/// Validated fields for a task about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub status: TaskStatus,
}

/// Validated partial update; `None` leaves the field as it is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.status.is_none()
    }
}

impl TaskInput {
    pub fn new(title: Option<&str>, status: Option<TaskStatus>) -> Self {
        TaskInput {
            title: title.map(str::to_string),
            status: status.map(|s| s.as_str().to_string()),
        }
    }

    /// Validates the input for creation: title required, status optional and
    /// defaulting to `Pending`.
    pub fn validate_new(&self) -> Result<NewTask, ValidationErrors> {
        let mut errors = Vec::new();
        let title = match self.title.as_deref() {
            Some(raw) => collect(validate_title(raw, TITLE_REQUIRED), &mut errors),
            None => {
                errors.push(FieldError::new("title", TITLE_REQUIRED));
                None
            }
        };
        let status = collect(validate_status(self.status.as_deref()), &mut errors);

        match (title, status) {
            (Some(title), Some(status)) if errors.is_empty() => Ok(NewTask {
                title,
                status: status.unwrap_or_default(),
            }),
            _ => Err(ValidationErrors(errors)),
        }
    }

    /// Validates the input as a partial update; absent fields stay absent.
    pub fn validate_changes(&self) -> Result<TaskChanges, ValidationErrors> {
        let mut errors = Vec::new();
        let title = self
            .title
            .as_deref()
            .and_then(|raw| collect(validate_title(raw, TITLE_EMPTY), &mut errors));
        let status = collect(validate_status(self.status.as_deref()), &mut errors).flatten();

        if errors.is_empty() {
            Ok(TaskChanges { title, status })
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

fn collect<T>(result: Result<T, FieldError>, errors: &mut Vec<FieldError>) -> Option<T> {
    result.map_err(|error| errors.push(error)).ok()
}

/// Trims `raw` and checks it is 1 to 200 characters long.
pub fn validate_title(raw: &str, empty_message: &str) -> Result<String, FieldError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(FieldError::new("title", empty_message));
    }
    if title.chars().count() > TITLE_MAX_LENGTH {
        return Err(FieldError::new("title", TITLE_TOO_LONG));
    }
    Ok(title.to_string())
}

pub fn validate_status(raw: Option<&str>) -> Result<Option<TaskStatus>, FieldError> {
    raw.map(|value| {
        value
            .parse::<TaskStatus>()
            .map_err(|_| FieldError::new("status", STATUS_INVALID))
    })
    .transpose()
}
