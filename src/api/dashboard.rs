use crate::domain::dashboard::driving_ports::{DashboardError, DashboardPort};
use crate::external_connections::ExternalConnectivity;
use crate::routing_utils::{GenericErrorResponse, Json};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::State;
use axum::response::ErrorResponse;
use axum::routing::get;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(paths(dashboard_stats, upcoming_tasks))]
/// Defines the OpenAPI documentation for the dashboard API
pub struct DashboardApi;
/// Constant used to group dashboard endpoints in OpenAPI documentation
pub const DASHBOARD_API_GROUP: &str = "Dashboard";

/// Adds routes under "/dashboard" to the application router
pub fn dashboard_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/stats",
            get(|State(app_state): AppState| async move {
                let mut ext_cxn = app_state.ext_cxn.clone();
                let dashboard_service = domain::dashboard::DashboardService {};

                dashboard_stats(&mut ext_cxn, &dashboard_service).await
            }),
        )
        .route(
            "/upcoming-tasks",
            get(|State(app_state): AppState| async move {
                let mut ext_cxn = app_state.ext_cxn.clone();
                let dashboard_service = domain::dashboard::DashboardService {};

                upcoming_tasks(Utc::now(), &mut ext_cxn, &dashboard_service).await
            }),
        )
}

fn dashboard_error_response(err: DashboardError, failure_message: &'static str) -> ErrorResponse {
    match err {
        DashboardError::PortError(cause) => {
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
    path = "/dashboard/stats",
    tag = DASHBOARD_API_GROUP,
    responses(
        (status = 200, description = "Headline numbers across all projects", body = dto::dashboard::DashboardStats),
        (status = 500, description = "Statistics could not be gathered", body = BasicErrorResponse),
    ),
)]
/// Summarizes projects, tasks, team members and budget use
async fn dashboard_stats(
    ext_cxn: &mut impl ExternalConnectivity,
    dashboard_service: &impl DashboardPort,
) -> Result<Json<dto::dashboard::DashboardStats>, ErrorResponse> {
    info!("Gathering dashboard statistics");
    let dashboard_reader = persistence::db_dashboard_driven_ports::DbDashboardReader {};

    let stats = dashboard_service
        .stats(&mut *ext_cxn, &dashboard_reader)
        .await
        .map_err(|err| dashboard_error_response(err, "Failed to fetch dashboard statistics"))?;

    Ok(Json(dto::dashboard::DashboardStats::from(stats)))
}

#[utoipa::path(
    get,
    path = "/dashboard/upcoming-tasks",
    tag = DASHBOARD_API_GROUP,
    responses(
        (status = 200, description = "Up to five unfinished tasks due soonest", body = Vec<dto::task::Task>),
        (status = 500, description = "Tasks could not be fetched", body = BasicErrorResponse),
    ),
)]
/// Lists the next few unfinished tasks that are due from now on
async fn upcoming_tasks(
    now: DateTime<Utc>,
    ext_cxn: &mut impl ExternalConnectivity,
    dashboard_service: &impl DashboardPort,
) -> Result<Json<Vec<dto::task::Task>>, ErrorResponse> {
    info!("Fetching upcoming tasks");
    let task_reader = persistence::db_task_driven_ports::DbTaskReader {};

    let tasks = dashboard_service
        .upcoming_tasks(now, &mut *ext_cxn, &task_reader)
        .await
        .map_err(|err| dashboard_error_response(err, "Failed to fetch upcoming tasks"))?;

    Ok(Json(tasks.into_iter().map(dto::task::Task::from).collect()))
}
