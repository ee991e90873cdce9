use crate::task::api::v1;
use crate::web::HealthResponse;
use utoipa::OpenApi;

/// OpenAPI description of the JSON API, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(title = "Task Management API", description = "CRUD endpoints for tasks"),
    paths(
        crate::web::health_check_handler,
        v1::list_tasks_handler,
        v1::get_task_handler,
        v1::create_task_handler,
        v1::update_task_handler,
        v1::delete_task_handler,
        v1::toggle_task_status_handler,
    ),
    components(schemas(
        HealthResponse,
        v1::TaskJson,
        v1::StatsJson,
        v1::TaskListResponse,
        v1::TaskResponse,
        v1::TaskRequest,
        v1::ErrorResponse,
        v1::FieldErrorJson,
    )),
    tags((name = "Tasks", description = "Task management"))
)]
pub struct ApiDoc;
