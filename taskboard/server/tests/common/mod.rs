#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue, DatabaseConnection};
use serde_json::Value;
use std::sync::Arc;
use taskboard_core::{Task, TaskId, TaskStatus};
use taskboard_server::config::Config;
use taskboard_server::entities::task;
use taskboard_server::web::{AppState, connect_database, create_app};
use tower::ServiceExt;

pub const MEMORY_DB_URL: &str = "sqlite::memory:";

/// Test context backed by a fresh in-memory database.
pub struct TestContext {
    pub db: Arc<DatabaseConnection>,
}

impl TestContext {
    /// Builds the full application against this context's database.
    pub fn app(&self, environment: Option<&str>) -> Router {
        let config = Config {
            db_url: MEMORY_DB_URL.to_string(),
            port: 0,
            environment: environment.map(str::to_string),
        };
        create_app(AppState {
            config: Arc::new(config),
            db: self.db.clone(),
        })
    }
}

pub async fn setup() -> anyhow::Result<TestContext> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    let db = connect_database(MEMORY_DB_URL).await?;
    Ok(TestContext { db: Arc::new(db) })
}

/// Inserts a task row directly, bypassing the service, with both timestamps set
/// to `created_at`.
pub async fn insert_task(
    db: &DatabaseConnection,
    title: &str,
    status: TaskStatus,
    created_at: DateTime<Utc>,
) -> Task {
    let active_model = task::ActiveModel {
        id: ActiveValue::Set(TaskId::generate().to_string()),
        title: ActiveValue::Set(title.to_string()),
        status: ActiveValue::Set(status.as_str().to_string()),
        created_at: ActiveValue::Set(created_at),
        updated_at: ActiveValue::Set(created_at),
    };
    let model = active_model
        .insert(db)
        .await
        .expect("Failed to insert task");
    Task::try_from(model).expect("Inserted task is malformed")
}

/// Sends a request through `app` and returns the status and parsed JSON body.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = match body {
        Some(json) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty()),
    }
    .unwrap();
    send_request(app, request).await
}

pub async fn send_request(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}
