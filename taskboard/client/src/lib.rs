//! Client-side task state for Taskboard.
//!
//! [`TaskStore`] holds a [`TaskState`] that mirrors the server's task
//! collection and drives it through [`TaskApi`] calls. The state itself only
//! changes through the pure [`TaskState::reduce`].
pub mod api;
pub mod config;
pub mod state;
pub mod store;

pub use api::{ApiError, HttpTaskApi, TaskApi, TaskList};
pub use config::ClientConfig;
pub use state::{TaskAction, TaskState};
pub use store::TaskStore;
