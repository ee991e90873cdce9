//! Status filtering, title search and sort keys for task listings.
//!
//! The same predicate backs the server's list endpoint and the client's derived
//! view, so a filtered working set always agrees with what the server would
//! return for the same filter and search term.

use crate::task::{Task, TaskStatus};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Status filter; `All` disables status filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl StatusFilter {
    /// The status a task must have to pass, or `None` for `All`.
    pub fn status(self) -> Option<TaskStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Pending => Some(TaskStatus::Pending),
            StatusFilter::Completed => Some(TaskStatus::Completed),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Pending => "Pending",
            StatusFilter::Completed => "Completed",
        }
    }
}

/// Returned when a query parameter holds a value outside its allowed set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported value '{0}'")]
pub struct UnsupportedValue(pub String);

impl FromStr for StatusFilter {
    type Err = UnsupportedValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "All" => Ok(StatusFilter::All),
            "Pending" => Ok(StatusFilter::Pending),
            "Completed" => Ok(StatusFilter::Completed),
            other => Err(UnsupportedValue(other.to_string())),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field a listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Status,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "createdAt",
            SortField::UpdatedAt => "updatedAt",
            SortField::Title => "title",
            SortField::Status => "status",
        }
    }
}

impl FromStr for SortField {
    type Err = UnsupportedValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" => Ok(SortField::CreatedAt),
            "updatedAt" => Ok(SortField::UpdatedAt),
            "title" => Ok(SortField::Title),
            "status" => Ok(SortField::Status),
            other => Err(UnsupportedValue(other.to_string())),
        }
    }
}

/// Direction of a listing; newest first unless asked otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = UnsupportedValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(UnsupportedValue(other.to_string())),
        }
    }
}

/// Status filter plus title search, ANDed together.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskFilter {
    pub status: StatusFilter,
    pub search: String,
}

impl TaskFilter {
    pub fn new(status: StatusFilter, search: impl Into<String>) -> Self {
        TaskFilter {
            status,
            search: search.into(),
        }
    }

    /// Whether `task` passes both the status filter and the search term.
    ///
    /// A blank search term matches every title; otherwise the trimmed term must
    /// occur in the title, ignoring case.
    pub fn matches(&self, task: &Task) -> bool {
        self.matches_status(task) && title_contains(&task.title, &self.search)
    }

    /// Tasks from `tasks` that pass the filter, in their original order.
    pub fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        tasks.iter().filter(|task| self.matches(task)).cloned().collect()
    }

    fn matches_status(&self, task: &Task) -> bool {
        self.status.status().is_none_or(|status| task.status == status)
    }
}

/// Case-insensitive substring test used for title search.
pub fn title_contains(title: &str, search: &str) -> bool {
    let needle = search.trim();
    needle.is_empty() || title.to_lowercase().contains(&needle.to_lowercase())
}

/// Parameters of a task listing; `None` means the server default.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskQuery {
    pub status: Option<StatusFilter>,
    pub search: Option<String>,
    pub sort_by: Option<SortField>,
    pub sort_order: Option<SortOrder>,
}

impl TaskQuery {
    /// The filter this query describes.
    pub fn filter(&self) -> TaskFilter {
        TaskFilter::new(
            self.status.unwrap_or_default(),
            self.search.clone().unwrap_or_default(),
        )
    }

    /// Query string pairs for the non-default parameters, in a stable order.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                pairs.push(("search", search.to_string()));
            }
        }
        if let Some(sort_by) = self.sort_by {
            pairs.push(("sortBy", sort_by.as_str().to_string()));
        }
        if let Some(sort_order) = self.sort_order {
            pairs.push(("sortOrder", sort_order.as_str().to_string()));
        }
        pairs
    }
}
