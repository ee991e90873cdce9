use axum::extract::State;
use axum::http::{Response, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::SecondsFormat;
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;
use taskboard_core::timestamp_now;
use tower::ServiceBuilder;
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::task::TaskRouterState;

pub mod api;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<DatabaseConnection>,
}

/// Liveness report returned by `/api/health`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    message: String,
    /// Current server time, RFC 3339 with milliseconds
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    environment: Option<String>,
}

#[derive(Debug, Serialize)]
struct NotFoundResponse {
    message: &'static str,
    path: String,
}

/// Connects to the database and brings the schema up to date.
///
/// An in-memory SQLite database only lives as long as its connection, so the
/// pool is pinned to a single connection in that case.
pub async fn connect_database(db_url: &str) -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(db_url);
    if db_url.starts_with("sqlite::memory:") {
        options.max_connections(1).min_connections(1);
    }

    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");
    Ok(db)
}

/// Builds the full application router: health check, task API, API docs and
/// the JSON 404 fallback, wrapped in tracing, panic and CORS layers.
///
/// A known path requested with an unsupported method is answered like an
/// unknown route.
pub fn create_app(state: AppState) -> Router {
    let expose_error_details = state.config.is_development();
    let task_state = Arc::new(TaskRouterState {
        db: state.db.clone(),
        expose_error_details,
    });

    Router::new()
        .route("/api/health", get(health_check_handler))
        .with_state(state)
        .merge(crate::task::api::v1::create_api_router(task_state))
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::ApiDoc::openapi()),
        )
        .fallback(not_found_handler)
        .method_not_allowed_fallback(not_found_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(PanicResponder {
                    expose_details: expose_error_details,
                }))
                .layer(CorsLayer::permissive()),
        )
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let db = Arc::new(connect_database(&config.db_url).await?);

    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!(
        "Web server running on http://{} in {} mode",
        server_address,
        config.environment.as_deref().unwrap_or("default")
    );

    let app = create_app(AppState {
        config: Arc::new(config),
        db: db.clone(),
    });
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Ok(db) = Arc::try_unwrap(db) {
        db.close().await?;
        tracing::info!("Database connection closed");
    }
    Ok(())
}

/// Handler for GET /api/health - Reports that the server is up.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Server is running", body = HealthResponse)),
    tag = "Health"
)]
pub async fn health_check_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "Task Management API is running!".to_string(),
        timestamp: timestamp_now().to_rfc3339_opts(SecondsFormat::Millis, true),
        environment: state.config.environment.clone(),
    })
}

#[tracing::instrument]
pub async fn not_found_handler(uri: Uri) -> impl IntoResponse {
    let path = uri
        .path_and_query()
        .map(|path| path.as_str())
        .unwrap_or_else(|| uri.path())
        .to_string();
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            message: "Route not found",
            path,
        }),
    )
}

/// Turns a panic inside a handler into a JSON 500 response.
#[derive(Clone, Debug)]
struct PanicResponder {
    expose_details: bool,
}

impl ResponseForPanic for PanicResponder {
    type ResponseBody = axum::body::Body;

    fn response_for_panic(
        &mut self,
        err: Box<dyn Any + Send + 'static>,
    ) -> Response<Self::ResponseBody> {
        let detail = if let Some(message) = err.downcast_ref::<String>() {
            message.clone()
        } else if let Some(message) = err.downcast_ref::<&str>() {
            message.to_string()
        } else {
            "Unknown panic".to_string()
        };
        tracing::error!("Request handler panicked: {}", detail);

        let error = if self.expose_details {
            detail
        } else {
            "Internal server error".to_string()
        };
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "message": "Something went wrong!",
                "error": error,
            })),
        )
            .into_response()
    }
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
