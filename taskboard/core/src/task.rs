use chrono::{DateTime, SubsecRound, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque task identifier assigned by the server at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TaskId(Uuid);

/// Returned when a string is not a well-formed task identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid task ID format: '{0}'")]
pub struct InvalidTaskId(pub String);

impl TaskId {
    /// Generates a fresh, never-before-used identifier.
    pub fn generate() -> Self {
        TaskId(Uuid::new_v4())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for TaskId {
    type Err = InvalidTaskId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(TaskId)
            .map_err(|_| InvalidTaskId(s.to_string()))
    }
}

/// The two states a task can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

/// Returned when a string names neither task status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown task status '{0}'")]
pub struct UnknownStatus(pub String);

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Completed => "Completed",
        }
    }

    /// Returns the other status.
    pub fn toggled(self) -> Self {
        match self {
            TaskStatus::Pending => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::Pending,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(TaskStatus::Pending),
            "Completed" => Ok(TaskStatus::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Current time at the precision timestamps are stored with (milliseconds).
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// A single task.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Builds a brand new task stamped with `now` for both timestamps.
    pub fn new(title: String, status: TaskStatus, now: DateTime<Utc>) -> Self {
        Task {
            id: TaskId::generate(),
            title,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the given fields and refreshes `updated_at` if any value differs from
    /// the current one.
    ///
    /// Returns `true` when the task changed.
    pub fn apply(&mut self, changes: &crate::TaskChanges, now: DateTime<Utc>) -> bool {
        let mut changed = false;
        if let Some(title) = &changes.title {
            if *title != self.title {
                self.title = title.clone();
                changed = true;
            }
        }
        if let Some(status) = changes.status {
            if status != self.status {
                self.status = status;
                changed = true;
            }
        }
        if changed {
            self.touch(now);
        }
        changed
    }

    /// Flips the status and refreshes `updated_at`.
    pub fn toggle(&mut self, now: DateTime<Utc>) {
        self.status = self.status.toggled();
        self.touch(now);
    }

    /// Whole days elapsed since the task was created.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days().max(0)
    }

    // Never moves `updated_at` backwards, even if the clock does.
    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.updated_at);
    }
}

/// Aggregate counts over a task collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TaskStats {
    pub total: u64,
    pub pending: u64,
    pub completed: u64,
}

impl TaskStats {
    /// Builds stats from per-status counts; `total` is their sum.
    pub fn from_counts(pending: u64, completed: u64) -> Self {
        TaskStats {
            total: pending + completed,
            pending,
            completed,
        }
    }

    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let (pending, completed) =
            tasks
                .into_iter()
                .fold((0, 0), |(pending, completed), task| match task.status {
                    TaskStatus::Pending => (pending + 1, completed),
                    TaskStatus::Completed => (pending, completed + 1),
                });
        TaskStats::from_counts(pending, completed)
    }
}
