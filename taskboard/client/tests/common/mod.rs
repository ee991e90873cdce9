#![allow(dead_code)]

use std::sync::Arc;
use taskboard_client::{ClientConfig, HttpTaskApi, TaskStore};
use taskboard_server::config::Config;
use taskboard_server::web::{AppState, connect_database, create_app};

/// Starts the task server on an ephemeral port with a fresh in-memory
/// database and returns the base URL of its API.
pub async fn start_server() -> anyhow::Result<String> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();

    let db_url = "sqlite::memory:";
    let db = connect_database(db_url).await?;
    let app = create_app(AppState {
        config: Arc::new(Config {
            db_url: db_url.to_string(),
            port: 0,
            environment: None,
        }),
        db: Arc::new(db),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{}/api", address))
}

pub fn http_api(api_url: String) -> anyhow::Result<HttpTaskApi> {
    Ok(HttpTaskApi::new(&ClientConfig {
        api_url,
        timeout_secs: 5,
    })?)
}

/// Returns a store talking to a freshly started task server.
pub async fn setup() -> anyhow::Result<TaskStore<HttpTaskApi>> {
    let api = http_api(start_server().await?)?;
    Ok(TaskStore::new(api))
}
