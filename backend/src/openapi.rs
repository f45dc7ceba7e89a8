use shared::{
    CreateTaskRequest, ErrorBody, HealthStatus, Priority, Task, TaskPage, UpdateTaskRequest,
};
use utoipa::OpenApi;

use crate::routes::{health, tasks};

pub const DOCS_PATH: &str = "/api-docs";
pub const SPEC_PATH: &str = "/api/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(title = "Todo List API", description = "Paginated task management"),
    paths(
        tasks::get_tasks,
        tasks::get_task,
        tasks::create_task,
        tasks::update_task,
        tasks::delete_task,
        health::health_check
    ),
    components(schemas(
        Task,
        TaskPage,
        CreateTaskRequest,
        UpdateTaskRequest,
        Priority,
        ErrorBody,
        HealthStatus
    )),
    tags(
        (name = "tasks", description = "Task CRUD and listing"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;
