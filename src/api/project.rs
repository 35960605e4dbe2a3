use crate::api::task::task_error_response;
use crate::domain::project::driving_ports::{ProjectError, ProjectPort};
use crate::domain::task::driving_ports::TaskPort;
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
#[openapi(paths(
    list_projects,
    create_project,
    get_project,
    update_project,
    delete_project,
    project_tasks,
    project_budget
))]
/// Defines the OpenAPI documentation for the project API
pub struct ProjectApi;
/// Constant used to group project endpoints in OpenAPI documentation
pub const PROJECT_API_GROUP: &str = "Projects";

/// Adds routes under "/projects" to the application router
pub fn project_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/",
            get(
                |State(app_state): AppState, Query(query): Query<dto::project::ProjectListQuery>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let project_service = domain::project::ProjectService {};

                    list_projects(query, &mut ext_cxn, &project_service).await
                },
            )
            .post(
                |State(app_state): AppState, Json(new_project): Json<dto::project::NewProject>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let project_service = domain::project::ProjectService {};

                    create_project(new_project, &mut ext_cxn, &project_service).await
                },
            ),
        )
        .route(
            "/:project_id",
            get(
                |State(app_state): AppState, Path(project_id): Path<i32>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let project_service = domain::project::ProjectService {};

                    get_project(project_id, &mut ext_cxn, &project_service).await
                },
            )
            .put(
                |State(app_state): AppState,
                 Path(project_id): Path<i32>,
                 Json(update): Json<dto::project::UpdateProject>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let project_service = domain::project::ProjectService {};

                    update_project(project_id, update, &mut ext_cxn, &project_service).await
                },
            )
            .patch(
                |State(app_state): AppState,
                 Path(project_id): Path<i32>,
                 Json(update): Json<dto::project::UpdateProject>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let project_service = domain::project::ProjectService {};

                    update_project(project_id, update, &mut ext_cxn, &project_service).await
                },
            )
            .delete(
                |State(app_state): AppState, Path(project_id): Path<i32>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let project_service = domain::project::ProjectService {};

                    delete_project(project_id, &mut ext_cxn, &project_service).await
                },
            ),
        )
        .route(
            "/:project_id/tasks",
            get(
                |State(app_state): AppState,
                 Path(project_id): Path<i32>,
                 Query(sort): Query<dto::task::TaskSortQuery>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let task_service = domain::task::TaskService {};

                    project_tasks(project_id, sort, &mut ext_cxn, &task_service).await
                },
            ),
        )
        .route(
            "/:project_id/budget",
            get(
                |State(app_state): AppState, Path(project_id): Path<i32>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let project_service = domain::project::ProjectService {};

                    project_budget(project_id, &mut ext_cxn, &project_service).await
                },
            ),
        )
}

fn project_error_response(err: ProjectError, failure_message: &'static str) -> ErrorResponse {
    match err {
        ProjectError::Invalid(errors) => ValidationErrorResponse::from(errors).into(),
        ProjectError::NotFound => NotFoundResponse("Project").into(),
        ProjectError::PortError(cause) => {
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
    path = "/projects",
    tag = PROJECT_API_GROUP,
    params(dto::project::ProjectListQuery),
    responses(
        (status = 200, description = "Projects matching the filters, ordered by id", body = Vec<dto::project::Project>),
        (status = 422, description = "Unknown filter value", body = BasicErrorResponse),
        (status = 500, description = "Projects could not be fetched", body = BasicErrorResponse),
    ),
)]
/// Lists projects
async fn list_projects(
    query: dto::project::ProjectListQuery,
    ext_cxn: &mut impl ExternalConnectivity,
    project_service: &impl ProjectPort,
) -> Result<Json<Vec<dto::project::Project>>, ErrorResponse> {
    info!("Listing projects");
    let filter =
        domain::project::ProjectFilter::try_from(query).map_err(ValidationErrorResponse::from)?;
    let project_reader = persistence::db_project_driven_ports::DbReadProjects {};

    let projects = project_service
        .list_projects(&filter, &mut *ext_cxn, &project_reader)
        .await
        .map_err(|err| project_error_response(err, "Failed to fetch projects"))?;

    Ok(Json(
        projects
            .into_iter()
            .map(dto::project::Project::from)
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/projects",
    tag = PROJECT_API_GROUP,
    request_body = dto::project::NewProject,
    responses(
        (status = 201, description = "Project created", body = dto::project::Project),
        (status = 422, description = "Invalid project data", body = BasicErrorResponse),
        (status = 500, description = "Project could not be created", body = BasicErrorResponse),
    ),
)]
/// Creates a project
async fn create_project(
    new_project: dto::project::NewProject,
    ext_cxn: &mut impl ExternalConnectivity,
    project_service: &impl ProjectPort,
) -> Result<(StatusCode, Json<dto::project::Project>), ErrorResponse> {
    info!("Creating project");
    let new_project = domain::project::NewProject::try_from(new_project)
        .map_err(ValidationErrorResponse::from)?;
    let user_detect = persistence::db_user_driven_ports::DbDetectUser {};
    let project_writer = persistence::db_project_driven_ports::DbWriteProjects {};
    let project_reader = persistence::db_project_driven_ports::DbReadProjects {};

    let created = project_service
        .create_project(
            &new_project,
            &mut *ext_cxn,
            &user_detect,
            &project_writer,
            &project_reader,
        )
        .await
        .map_err(|err| project_error_response(err, "Failed to create project"))?;

    Ok((StatusCode::CREATED, Json(dto::project::Project::from(created))))
}

#[utoipa::path(
    get,
    path = "/projects/{id}",
    tag = PROJECT_API_GROUP,
    params(("id" = i32, Path, description = "Identifier of the project")),
    responses(
        (status = 200, description = "The requested project", body = dto::project::Project),
        (status = 404, description = "No such project", body = BasicErrorResponse),
        (status = 500, description = "Project could not be fetched", body = BasicErrorResponse),
    ),
)]
/// Retrieves one project
async fn get_project(
    project_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    project_service: &impl ProjectPort,
) -> Result<Json<dto::project::Project>, ErrorResponse> {
    info!("Fetching project {project_id}");
    let project_reader = persistence::db_project_driven_ports::DbReadProjects {};

    let project = project_service
        .project_by_id(project_id, &mut *ext_cxn, &project_reader)
        .await
        .map_err(|err| project_error_response(err, "Failed to fetch project"))?;

    Ok(Json(dto::project::Project::from(project)))
}

#[utoipa::path(
    put,
    path = "/projects/{id}",
    tag = PROJECT_API_GROUP,
    params(("id" = i32, Path, description = "Identifier of the project")),
    request_body = dto::project::UpdateProject,
    responses(
        (status = 200, description = "The updated project", body = dto::project::Project),
        (status = 404, description = "No such project", body = BasicErrorResponse),
        (status = 422, description = "Invalid project data", body = BasicErrorResponse),
        (status = 500, description = "Project could not be updated", body = BasicErrorResponse),
    ),
)]
/// Applies a partial update to a project. Also served for PATCH.
async fn update_project(
    project_id: i32,
    update: dto::project::UpdateProject,
    ext_cxn: &mut impl TransactableExternalConnectivity,
    project_service: &impl ProjectPort,
) -> Result<Json<dto::project::Project>, ErrorResponse> {
    info!("Updating project {project_id}");
    let update = domain::project::ProjectUpdate::try_from(update)
        .map_err(ValidationErrorResponse::from)?;
    let user_detect = persistence::db_user_driven_ports::DbDetectUser {};
    let project_reader = persistence::db_project_driven_ports::DbReadProjects {};
    let project_writer = persistence::db_project_driven_ports::DbWriteProjects {};

    let updated = project_service
        .update_project(
            project_id,
            &update,
            &mut *ext_cxn,
            &user_detect,
            &project_reader,
            &project_writer,
        )
        .await
        .map_err(|err| project_error_response(err, "Failed to update project"))?;

    Ok(Json(dto::project::Project::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/projects/{id}",
    tag = PROJECT_API_GROUP,
    params(("id" = i32, Path, description = "Identifier of the project")),
    responses(
        (status = 200, description = "Project and its tasks deleted", body = dto::MessageResponse),
        (status = 404, description = "No such project", body = BasicErrorResponse),
        (status = 500, description = "Project could not be deleted", body = BasicErrorResponse),
    ),
)]
/// Deletes a project along with all of its tasks
async fn delete_project(
    project_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    project_service: &impl ProjectPort,
) -> Result<Json<dto::MessageResponse>, ErrorResponse> {
    info!("Deleting project {project_id}");
    let project_writer = persistence::db_project_driven_ports::DbWriteProjects {};

    project_service
        .delete_project(project_id, &mut *ext_cxn, &project_writer)
        .await
        .map_err(|err| project_error_response(err, "Failed to delete project"))?;

    Ok(Json(dto::MessageResponse::new(
        "Project deleted successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/projects/{id}/tasks",
    tag = PROJECT_API_GROUP,
    params(
        ("id" = i32, Path, description = "Identifier of the project"),
        dto::task::TaskSortQuery,
    ),
    responses(
        (status = 200, description = "The project's tasks", body = Vec<dto::task::Task>),
        (status = 404, description = "No such project", body = BasicErrorResponse),
        (status = 422, description = "Unknown sort value", body = BasicErrorResponse),
        (status = 500, description = "Tasks could not be fetched", body = BasicErrorResponse),
    ),
)]
/// Lists the tasks belonging to a single project
async fn project_tasks(
    project_id: i32,
    sort: dto::task::TaskSortQuery,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
) -> Result<Json<Vec<dto::task::Task>>, ErrorResponse> {
    info!("Listing tasks for project {project_id}");
    let sort = domain::task::TaskSort::try_from(sort).map_err(ValidationErrorResponse::from)?;
    let project_detect = persistence::db_project_driven_ports::DbDetectProject {};
    let task_reader = persistence::db_task_driven_ports::DbTaskReader {};

    let tasks = task_service
        .tasks_for_project(
            project_id,
            sort,
            &mut *ext_cxn,
            &project_detect,
            &task_reader,
        )
        .await
        .map_err(|err| task_error_response(err, "Failed to fetch project tasks"))?;

    Ok(Json(tasks.into_iter().map(dto::task::Task::from).collect()))
}

#[utoipa::path(
    get,
    path = "/projects/{id}/budget",
    tag = PROJECT_API_GROUP,
    params(("id" = i32, Path, description = "Identifier of the project")),
    responses(
        (status = 200, description = "Budget summary for the project", body = dto::project::BudgetSummary),
        (status = 404, description = "No such project", body = BasicErrorResponse),
        (status = 500, description = "Budget could not be computed", body = BasicErrorResponse),
    ),
)]
/// Compares a project's estimated budget with what has been spent
async fn project_budget(
    project_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    project_service: &impl ProjectPort,
) -> Result<Json<dto::project::BudgetSummary>, ErrorResponse> {
    info!("Summarizing budget for project {project_id}");
    let project_reader = persistence::db_project_driven_ports::DbReadProjects {};

    let summary = project_service
        .project_budget(project_id, &mut *ext_cxn, &project_reader)
        .await
        .map_err(|err| project_error_response(err, "Failed to fetch project budget"))?;

    Ok(Json(dto::project::BudgetSummary::from(summary)))
}
