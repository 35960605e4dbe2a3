use crate::domain::task::driving_ports::{TaskError, TaskPort};
use crate::external_connections::{ExternalConnectivity, TransactableExternalConnectivity};
use crate::routing_utils::{
    GenericErrorResponse, Json, NotFoundResponse, Path, Query, ValidationErrorResponse,
};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::ErrorResponse;
use axum::routing::get;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(paths(list_tasks, create_task, get_task, update_task, delete_task))]
/// Defines the OpenAPI documentation for the task API
pub struct TaskApi;
/// Constant used to group task endpoints in OpenAPI documentation
pub const TASK_API_GROUP: &str = "Tasks";

/// Adds routes under "/tasks" to the application router
pub fn task_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/",
            get(
                |State(app_state): AppState, Query(query): Query<dto::task::TaskListQuery>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    list_tasks(query, &mut ext_cxn, &task_service).await
                },
            )
            .post(
                |State(app_state): AppState, Json(new_task): Json<dto::task::NewTask>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    create_task(new_task, &mut ext_cxn, &task_service).await
                },
            ),
        )
        .route(
            "/:task_id",
            get(
                |State(app_state): AppState, Path(task_id): Path<i32>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    get_task(task_id, &mut ext_cxn, &task_service).await
                },
            )
            .put(
                |State(app_state): AppState,
                 Path(task_id): Path<i32>,
                 Json(update): Json<dto::task::UpdateTask>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    update_task(task_id, update, &mut ext_cxn, &task_service).await
                },
            )
            .patch(
                |State(app_state): AppState,
                 Path(task_id): Path<i32>,
                 Json(update): Json<dto::task::UpdateTask>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    update_task(task_id, update, &mut ext_cxn, &task_service).await
                },
            )
            .delete(
                |State(app_state): AppState, Path(task_id): Path<i32>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    delete_task(task_id, &mut ext_cxn, &task_service).await
                },
            ),
        )
}

/// Converts a failed task operation into the matching HTTP response, logging unexpected failures
pub(crate) fn task_error_response(err: TaskError, failure_message: &'static str) -> ErrorResponse {
    match err {
        TaskError::Invalid(errors) => ValidationErrorResponse::from(errors).into(),
        TaskError::NotFound => NotFoundResponse("Task").into(),
        TaskError::ProjectNotFound => NotFoundResponse("Project").into(),
        TaskError::PortError(cause) => {
            error!("{failure_message}: {cause:#}");
            GenericErrorResponse {
                message: failure_message,
                cause,
            }
            .into()
        }
    }
}

#[utoipa::path(
    get,
    path = "/tasks",
    tag = TASK_API_GROUP,
    params(dto::task::TaskListQuery),
    responses(
        (status = 200, description = "Tasks matching the filters", body = Vec<dto::task::Task>),
        (status = 422, description = "Unknown filter or sort value", body = BasicErrorResponse),
        (status = 500, description = "Tasks could not be fetched", body = BasicErrorResponse),
    ),
)]
/// Lists tasks with their project and assignee, filtered and sorted as requested
async fn list_tasks(
    query: dto::task::TaskListQuery,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<Vec<dto::task::Task>>, ErrorResponse> {
    info!("Listing tasks");
    let query = domain::task::TaskQuery::try_from(query).map_err(ValidationErrorResponse::from)?;
    let task_reader = persistence::db_task_driven_ports::DbTaskReader {};

    let tasks = task_service
        .list_tasks(&query, &mut *ext_cxn, &task_reader)
        .await
        .map_err(|err| task_error_response(err, "Failed to fetch tasks"))?;

    Ok(Json(tasks.into_iter().map(dto::task::Task::from).collect()))
}

#[utoipa::path(
    post,
    path = "/tasks",
    tag = TASK_API_GROUP,
    request_body = dto::task::NewTask,
    responses(
        (status = 201, description = "Task created", body = dto::task::Task),
        (status = 422, description = "Invalid task data", body = BasicErrorResponse),
        (status = 500, description = "Task could not be created", body = BasicErrorResponse),
    ),
)]
/// Creates a task and returns it with its relations
async fn create_task(
    new_task: dto::task::NewTask,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<(StatusCode, Json<dto::task::Task>), ErrorResponse> {
    info!("Creating task");
    let new_task = domain::task::NewTask::try_from(new_task).map_err(ValidationErrorResponse::from)?;
    let project_detect = persistence::db_project_driven_ports::DbDetectProject {};
    let user_detect = persistence::db_user_driven_ports::DbDetectUser {};
    let task_writer = persistence::db_task_driven_ports::DbTaskWriter {};
    let task_reader = persistence::db_task_driven_ports::DbTaskReader {};

    let created = task_service
        .create_task(
            &new_task,
            &mut *ext_cxn,
            &project_detect,
            &user_detect,
            &task_writer,
            &task_reader,
        )
        .await
        .map_err(|err| task_error_response(err, "Failed to create task"))?;

    Ok((StatusCode::CREATED, Json(dto::task::Task::from(created))))
}

#[utoipa::path(
    get,
    path = "/tasks/{id}",
    tag = TASK_API_GROUP,
    params(("id" = i32, Path, description = "Identifier of the task")),
    responses(
        (status = 200, description = "The requested task", body = dto::task::Task),
        (status = 404, description = "No such task", body = BasicErrorResponse),
        (status = 500, description = "Task could not be fetched", body = BasicErrorResponse),
    ),
)]
/// Retrieves one task with its relations
async fn get_task(
    task_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<dto::task::Task>, ErrorResponse> {
    info!("Fetching task {task_id}");
    let task_reader = persistence::db_task_driven_ports::DbTaskReader {};

    let task = task_service
        .task_by_id(task_id, &mut *ext_cxn, &task_reader)
        .await
        .map_err(|err| task_error_response(err, "Failed to fetch task"))?;

    Ok(Json(dto::task::Task::from(task)))
}

#[utoipa::path(
    put,
    path = "/tasks/{id}",
    tag = TASK_API_GROUP,
    params(("id" = i32, Path, description = "Identifier of the task")),
    request_body = dto::task::UpdateTask,
    responses(
        (status = 200, description = "The updated task", body = dto::task::Task),
        (status = 404, description = "No such task", body = BasicErrorResponse),
        (status = 422, description = "Invalid task data", body = BasicErrorResponse),
        (status = 500, description = "Task could not be updated", body = BasicErrorResponse),
    ),
)]
/// Applies a partial update to a task. Also served for PATCH.
async fn update_task(
    task_id: i32,
    update: dto::task::UpdateTask,
    ext_cxn: &mut impl TransactableExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<dto::task::Task>, ErrorResponse> {
    info!("Updating task {task_id}");
    let update = domain::task::TaskUpdate::try_from(update).map_err(ValidationErrorResponse::from)?;
    let project_detect = persistence::db_project_driven_ports::DbDetectProject {};
    let user_detect = persistence::db_user_driven_ports::DbDetectUser {};
    let task_reader = persistence::db_task_driven_ports::DbTaskReader {};
    let task_writer = persistence::db_task_driven_ports::DbTaskWriter {};

    let updated = task_service
        .update_task(
            task_id,
            &update,
            &mut *ext_cxn,
            &project_detect,
            &user_detect,
            &task_reader,
            &task_writer,
        )
        .await
        .map_err(|err| task_error_response(err, "Failed to update task"))?;

    Ok(Json(dto::task::Task::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    tag = TASK_API_GROUP,
    params(("id" = i32, Path, description = "Identifier of the task")),
    responses(
        (status = 200, description = "Task deleted", body = dto::MessageResponse),
        (status = 404, description = "No such task", body = BasicErrorResponse),
        (status = 500, description = "Task could not be deleted", body = BasicErrorResponse),
    ),
)]
/// Deletes a task
async fn delete_task(
    task_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<dto::MessageResponse>, ErrorResponse> {
    info!("Deleting task {task_id}");
    let task_writer = persistence::db_task_driven_ports::DbTaskWriter {};

    task_service
        .delete_task(task_id, &mut *ext_cxn, &task_writer)
        .await
        .map_err(|err| task_error_response(err, "Failed to delete task"))?;

    Ok(Json(dto::MessageResponse::new("Task deleted successfully")))
}
