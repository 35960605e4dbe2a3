use crate::domain::time_entry::driving_ports::{TimeEntryError, TimeEntryPort};
use crate::external_connections::{ExternalConnectivity, TransactableExternalConnectivity};
use crate::routing_utils::{
    GenericErrorResponse, Json, NotFoundResponse, Path, ValidationErrorResponse,
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
#[openapi(paths(
    list_time_entries,
    create_time_entry,
    get_time_entry,
    update_time_entry,
    delete_time_entry
))]
/// Defines the OpenAPI documentation for time logged against tasks
pub struct TimeEntryApi;
/// Constant used to group time entry endpoints in OpenAPI documentation
pub const TIME_ENTRY_API_GROUP: &str = "Time Entries";

/// Routes for the time entries of a task. Merged into the "/tasks" router.
pub fn time_entry_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/:task_id/time-entries",
            get(
                |State(app_state): AppState, Path(task_id): Path<i32>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let time_entry_service = domain::time_entry::TimeEntryService {};

                    list_time_entries(task_id, &mut ext_cxn, &time_entry_service).await
                },
            )
            .post(
                |State(app_state): AppState,
                 Path(task_id): Path<i32>,
                 Json(new_entry): Json<dto::time_entry::NewTimeEntry>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let time_entry_service = domain::time_entry::TimeEntryService {};

                    create_time_entry(task_id, new_entry, &mut ext_cxn, &time_entry_service).await
                },
            ),
        )
        .route(
            "/:task_id/time-entries/:entry_id",
            get(
                |State(app_state): AppState, Path((task_id, entry_id)): Path<(i32, i32)>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let time_entry_service = domain::time_entry::TimeEntryService {};

                    get_time_entry(task_id, entry_id, &mut ext_cxn, &time_entry_service).await
                },
            )
            .put(
                |State(app_state): AppState,
                 Path((task_id, entry_id)): Path<(i32, i32)>,
                 Json(update): Json<dto::time_entry::UpdateTimeEntry>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let time_entry_service = domain::time_entry::TimeEntryService {};

                    update_time_entry(task_id, entry_id, update, &mut ext_cxn, &time_entry_service)
                        .await
                },
            )
            .patch(
                |State(app_state): AppState,
                 Path((task_id, entry_id)): Path<(i32, i32)>,
                 Json(update): Json<dto::time_entry::UpdateTimeEntry>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let time_entry_service = domain::time_entry::TimeEntryService {};

                    update_time_entry(task_id, entry_id, update, &mut ext_cxn, &time_entry_service)
                        .await
                },
            )
            .delete(
                |State(app_state): AppState, Path((task_id, entry_id)): Path<(i32, i32)>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let time_entry_service = domain::time_entry::TimeEntryService {};

                    delete_time_entry(task_id, entry_id, &mut ext_cxn, &time_entry_service).await
                },
            ),
        )
}

fn time_entry_error_response(err: TimeEntryError, failure_message: &'static str) -> ErrorResponse {
    match err {
        TimeEntryError::Invalid(errors) => ValidationErrorResponse::from(errors).into(),
        TimeEntryError::NotFound => NotFoundResponse("Time entry").into(),
        TimeEntryError::TaskNotFound => NotFoundResponse("Task").into(),
        TimeEntryError::PortError(cause) => {
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
    path = "/tasks/{task_id}/time-entries",
    tag = TIME_ENTRY_API_GROUP,
    params(("task_id" = i32, Path, description = "Identifier of the task")),
    responses(
        (status = 200, description = "Time logged against the task, latest first", body = Vec<dto::time_entry::TimeEntry>),
        (status = 404, description = "No such task", body = BasicErrorResponse),
        (status = 500, description = "Time entries could not be fetched", body = BasicErrorResponse),
    ),
)]
/// Lists the time logged against a task, most recently started first
async fn list_time_entries(
    task_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    time_entry_service: &impl TimeEntryPort,
) -> Result<Json<Vec<dto::time_entry::TimeEntry>>, ErrorResponse> {
    info!("Listing time entries of task {task_id}");
    let task_detect = persistence::db_task_driven_ports::DbDetectTask {};
    let entry_reader = persistence::db_time_entry_driven_ports::DbTimeEntryReader {};

    let entries = time_entry_service
        .list_time_entries(task_id, &mut *ext_cxn, &task_detect, &entry_reader)
        .await
        .map_err(|err| time_entry_error_response(err, "Failed to fetch time entries"))?;

    Ok(Json(
        entries
            .into_iter()
            .map(dto::time_entry::TimeEntry::from)
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/tasks/{task_id}/time-entries",
    tag = TIME_ENTRY_API_GROUP,
    params(("task_id" = i32, Path, description = "Identifier of the task")),
    request_body = dto::time_entry::NewTimeEntry,
    responses(
        (status = 201, description = "Time logged", body = dto::time_entry::TimeEntry),
        (status = 404, description = "No such task", body = BasicErrorResponse),
        (status = 422, description = "Invalid time entry data", body = BasicErrorResponse),
        (status = 500, description = "Time entry could not be created", body = BasicErrorResponse),
    ),
)]
/// Logs time against a task
async fn create_time_entry(
    task_id: i32,
    new_entry: dto::time_entry::NewTimeEntry,
    ext_cxn: &mut impl ExternalConnectivity,
    time_entry_service: &impl TimeEntryPort,
) -> Result<(StatusCode, Json<dto::time_entry::TimeEntry>), ErrorResponse> {
    info!("Logging time against task {task_id}");
    let new_entry = domain::time_entry::NewTimeEntry::try_from(new_entry)
        .map_err(ValidationErrorResponse::from)?;
    let task_detect = persistence::db_task_driven_ports::DbDetectTask {};
    let entry_writer = persistence::db_time_entry_driven_ports::DbTimeEntryWriter {};
    let entry_reader = persistence::db_time_entry_driven_ports::DbTimeEntryReader {};

    let created = time_entry_service
        .create_time_entry(
            task_id,
            &new_entry,
            &mut *ext_cxn,
            &task_detect,
            &entry_writer,
            &entry_reader,
        )
        .await
        .map_err(|err| time_entry_error_response(err, "Failed to create time entry"))?;

    Ok((StatusCode::CREATED, Json(dto::time_entry::TimeEntry::from(created))))
}

#[utoipa::path(
    get,
    path = "/tasks/{task_id}/time-entries/{id}",
    tag = TIME_ENTRY_API_GROUP,
    params(
        ("task_id" = i32, Path, description = "Identifier of the task"),
        ("id" = i32, Path, description = "Identifier of the time entry"),
    ),
    responses(
        (status = 200, description = "The requested time entry", body = dto::time_entry::TimeEntry),
        (status = 404, description = "No such time entry on this task", body = BasicErrorResponse),
        (status = 500, description = "Time entry could not be fetched", body = BasicErrorResponse),
    ),
)]
/// Retrieves one time entry of a task
async fn get_time_entry(
    task_id: i32,
    entry_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    time_entry_service: &impl TimeEntryPort,
) -> Result<Json<dto::time_entry::TimeEntry>, ErrorResponse> {
    info!("Fetching time entry {entry_id} of task {task_id}");
    let entry_reader = persistence::db_time_entry_driven_ports::DbTimeEntryReader {};

    let entry = time_entry_service
        .time_entry_by_id(task_id, entry_id, &mut *ext_cxn, &entry_reader)
        .await
        .map_err(|err| time_entry_error_response(err, "Failed to fetch time entry"))?;

    Ok(Json(dto::time_entry::TimeEntry::from(entry)))
}

#[utoipa::path(
    put,
    path = "/tasks/{task_id}/time-entries/{id}",
    tag = TIME_ENTRY_API_GROUP,
    params(
        ("task_id" = i32, Path, description = "Identifier of the task"),
        ("id" = i32, Path, description = "Identifier of the time entry"),
    ),
    request_body = dto::time_entry::UpdateTimeEntry,
    responses(
        (status = 200, description = "The updated time entry", body = dto::time_entry::TimeEntry),
        (status = 404, description = "No such time entry on this task", body = BasicErrorResponse),
        (status = 422, description = "Invalid time entry data", body = BasicErrorResponse),
        (status = 500, description = "Time entry could not be updated", body = BasicErrorResponse),
    ),
)]
/// Applies a partial update to a time entry. Also served for PATCH.
async fn update_time_entry(
    task_id: i32,
    entry_id: i32,
    update: dto::time_entry::UpdateTimeEntry,
    ext_cxn: &mut impl TransactableExternalConnectivity,
    time_entry_service: &impl TimeEntryPort,
) -> Result<Json<dto::time_entry::TimeEntry>, ErrorResponse> {
    info!("Updating time entry {entry_id} of task {task_id}");
    let update = domain::time_entry::TimeEntryUpdate::try_from(update)
        .map_err(ValidationErrorResponse::from)?;
    let entry_reader = persistence::db_time_entry_driven_ports::DbTimeEntryReader {};
    let entry_writer = persistence::db_time_entry_driven_ports::DbTimeEntryWriter {};

    let updated = time_entry_service
        .update_time_entry(
            task_id,
            entry_id,
            &update,
            &mut *ext_cxn,
            &entry_reader,
            &entry_writer,
        )
        .await
        .map_err(|err| time_entry_error_response(err, "Failed to update time entry"))?;

    Ok(Json(dto::time_entry::TimeEntry::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/tasks/{task_id}/time-entries/{id}",
    tag = TIME_ENTRY_API_GROUP,
    params(
        ("task_id" = i32, Path, description = "Identifier of the task"),
        ("id" = i32, Path, description = "Identifier of the time entry"),
    ),
    responses(
        (status = 200, description = "Time entry deleted", body = dto::MessageResponse),
        (status = 404, description = "No such time entry on this task", body = BasicErrorResponse),
        (status = 500, description = "Time entry could not be deleted", body = BasicErrorResponse),
    ),
)]
/// Deletes a time entry
async fn delete_time_entry(
    task_id: i32,
    entry_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    time_entry_service: &impl TimeEntryPort,
) -> Result<Json<dto::MessageResponse>, ErrorResponse> {
    info!("Deleting time entry {entry_id} of task {task_id}");
    let entry_writer = persistence::db_time_entry_driven_ports::DbTimeEntryWriter {};

    time_entry_service
        .delete_time_entry(task_id, entry_id, &mut *ext_cxn, &entry_writer)
        .await
        .map_err(|err| time_entry_error_response(err, "Failed to delete time entry"))?;

    Ok(Json(dto::MessageResponse::new("Time entry deleted successfully")))
}
