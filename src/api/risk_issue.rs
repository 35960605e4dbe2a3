use crate::domain::risk_issue::driving_ports::{RiskIssueError, RiskIssuePort};
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
    list_risks_issues,
    create_risk_issue,
    get_risk_issue,
    update_risk_issue,
    delete_risk_issue
))]
/// Defines the OpenAPI documentation for the risk and issue register
pub struct RiskIssueApi;
/// Constant used to group risk and issue endpoints in OpenAPI documentation
pub const RISK_ISSUE_API_GROUP: &str = "Risks and Issues";

/// Adds routes under "/risks-issues" to the application router
pub fn risk_issue_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/",
            get(
                |State(app_state): AppState,
                 Query(query): Query<dto::risk_issue::RiskIssueListQuery>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let risk_issue_service = domain::risk_issue::RiskIssueService {};

                    list_risks_issues(query, &mut ext_cxn, &risk_issue_service).await
                },
            )
            .post(
                |State(app_state): AppState,
                 Json(new_risk_issue): Json<dto::risk_issue::NewRiskIssue>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let risk_issue_service = domain::risk_issue::RiskIssueService {};

                    create_risk_issue(new_risk_issue, &mut ext_cxn, &risk_issue_service).await
                },
            ),
        )
        .route(
            "/:risk_issue_id",
            get(
                |State(app_state): AppState, Path(risk_issue_id): Path<i32>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let risk_issue_service = domain::risk_issue::RiskIssueService {};

                    get_risk_issue(risk_issue_id, &mut ext_cxn, &risk_issue_service).await
                },
            )
            .put(
                |State(app_state): AppState,
                 Path(risk_issue_id): Path<i32>,
                 Json(update): Json<dto::risk_issue::UpdateRiskIssue>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let risk_issue_service = domain::risk_issue::RiskIssueService {};

                    update_risk_issue(risk_issue_id, update, &mut ext_cxn, &risk_issue_service).await
                },
            )
            .patch(
                |State(app_state): AppState,
                 Path(risk_issue_id): Path<i32>,
                 Json(update): Json<dto::risk_issue::UpdateRiskIssue>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let risk_issue_service = domain::risk_issue::RiskIssueService {};

                    update_risk_issue(risk_issue_id, update, &mut ext_cxn, &risk_issue_service).await
                },
            )
            .delete(
                |State(app_state): AppState, Path(risk_issue_id): Path<i32>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let risk_issue_service = domain::risk_issue::RiskIssueService {};

                    delete_risk_issue(risk_issue_id, &mut ext_cxn, &risk_issue_service).await
                },
            ),
        )
}

fn risk_issue_error_response(err: RiskIssueError, failure_message: &'static str) -> ErrorResponse {
    match err {
        RiskIssueError::Invalid(errors) => ValidationErrorResponse::from(errors).into(),
        RiskIssueError::NotFound => NotFoundResponse("Risk or issue").into(),
        RiskIssueError::PortError(cause) => {
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
    path = "/risks-issues",
    tag = RISK_ISSUE_API_GROUP,
    params(dto::risk_issue::RiskIssueListQuery),
    responses(
        (status = 200, description = "Risks and issues matching the filters", body = Vec<dto::risk_issue::RiskIssue>),
        (status = 422, description = "Unknown filter value", body = BasicErrorResponse),
        (status = 500, description = "Risks and issues could not be fetched", body = BasicErrorResponse),
    ),
)]
/// Lists risks and issues in the order they were recorded
async fn list_risks_issues(
    query: dto::risk_issue::RiskIssueListQuery,
    ext_cxn: &mut impl ExternalConnectivity,
    risk_issue_service: &impl RiskIssuePort,
) -> Result<Json<Vec<dto::risk_issue::RiskIssue>>, ErrorResponse> {
    info!("Listing risks and issues");
    let filter = domain::risk_issue::RiskIssueFilter::try_from(query)
        .map_err(ValidationErrorResponse::from)?;
    let risk_issue_reader = persistence::db_risk_issue_driven_ports::DbRiskIssueReader {};

    let risks_issues = risk_issue_service
        .list_risks_issues(&filter, &mut *ext_cxn, &risk_issue_reader)
        .await
        .map_err(|err| risk_issue_error_response(err, "Failed to fetch risks and issues"))?;

    Ok(Json(
        risks_issues
            .into_iter()
            .map(dto::risk_issue::RiskIssue::from)
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/risks-issues",
    tag = RISK_ISSUE_API_GROUP,
    request_body = dto::risk_issue::NewRiskIssue,
    responses(
        (status = 201, description = "Risk or issue recorded", body = dto::risk_issue::RiskIssue),
        (status = 422, description = "Invalid risk or issue data", body = BasicErrorResponse),
        (status = 500, description = "Risk or issue could not be created", body = BasicErrorResponse),
    ),
)]
/// Records a new risk or issue against a project
async fn create_risk_issue(
    new_risk_issue: dto::risk_issue::NewRiskIssue,
    ext_cxn: &mut impl ExternalConnectivity,
    risk_issue_service: &impl RiskIssuePort,
) -> Result<(StatusCode, Json<dto::risk_issue::RiskIssue>), ErrorResponse> {
    info!("Recording risk or issue");
    let new_risk_issue = domain::risk_issue::NewRiskIssue::try_from(new_risk_issue)
        .map_err(ValidationErrorResponse::from)?;
    let project_detect = persistence::db_project_driven_ports::DbDetectProject {};
    let user_detect = persistence::db_user_driven_ports::DbDetectUser {};
    let risk_issue_writer = persistence::db_risk_issue_driven_ports::DbRiskIssueWriter {};
    let risk_issue_reader = persistence::db_risk_issue_driven_ports::DbRiskIssueReader {};

    let created = risk_issue_service
        .create_risk_issue(
            &new_risk_issue,
            &mut *ext_cxn,
            &project_detect,
            &user_detect,
            &risk_issue_writer,
            &risk_issue_reader,
        )
        .await
        .map_err(|err| risk_issue_error_response(err, "Failed to create risk or issue"))?;

    Ok((StatusCode::CREATED, Json(dto::risk_issue::RiskIssue::from(created))))
}

#[utoipa::path(
    get,
    path = "/risks-issues/{id}",
    tag = RISK_ISSUE_API_GROUP,
    params(("id" = i32, Path, description = "Identifier of the risk or issue")),
    responses(
        (status = 200, description = "The requested risk or issue", body = dto::risk_issue::RiskIssue),
        (status = 404, description = "No such risk or issue", body = BasicErrorResponse),
        (status = 500, description = "Risk or issue could not be fetched", body = BasicErrorResponse),
    ),
)]
/// Retrieves one risk or issue
async fn get_risk_issue(
    risk_issue_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    risk_issue_service: &impl RiskIssuePort,
) -> Result<Json<dto::risk_issue::RiskIssue>, ErrorResponse> {
    info!("Fetching risk or issue {risk_issue_id}");
    let risk_issue_reader = persistence::db_risk_issue_driven_ports::DbRiskIssueReader {};

    let risk_issue = risk_issue_service
        .risk_issue_by_id(risk_issue_id, &mut *ext_cxn, &risk_issue_reader)
        .await
        .map_err(|err| risk_issue_error_response(err, "Failed to fetch risk or issue"))?;

    Ok(Json(dto::risk_issue::RiskIssue::from(risk_issue)))
}

#[utoipa::path(
    put,
    path = "/risks-issues/{id}",
    tag = RISK_ISSUE_API_GROUP,
    params(("id" = i32, Path, description = "Identifier of the risk or issue")),
    request_body = dto::risk_issue::UpdateRiskIssue,
    responses(
        (status = 200, description = "The updated risk or issue", body = dto::risk_issue::RiskIssue),
        (status = 404, description = "No such risk or issue", body = BasicErrorResponse),
        (status = 422, description = "Invalid risk or issue data", body = BasicErrorResponse),
        (status = 500, description = "Risk or issue could not be updated", body = BasicErrorResponse),
    ),
)]
/// Applies a partial update to a risk or issue. Also served for PATCH.
async fn update_risk_issue(
    risk_issue_id: i32,
    update: dto::risk_issue::UpdateRiskIssue,
    ext_cxn: &mut impl TransactableExternalConnectivity,
    risk_issue_service: &impl RiskIssuePort,
) -> Result<Json<dto::risk_issue::RiskIssue>, ErrorResponse> {
    info!("Updating risk or issue {risk_issue_id}");
    let update = domain::risk_issue::RiskIssueUpdate::try_from(update)
        .map_err(ValidationErrorResponse::from)?;
    let project_detect = persistence::db_project_driven_ports::DbDetectProject {};
    let user_detect = persistence::db_user_driven_ports::DbDetectUser {};
    let risk_issue_reader = persistence::db_risk_issue_driven_ports::DbRiskIssueReader {};
    let risk_issue_writer = persistence::db_risk_issue_driven_ports::DbRiskIssueWriter {};

    let updated = risk_issue_service
        .update_risk_issue(
            risk_issue_id,
            &update,
            &mut *ext_cxn,
            &project_detect,
            &user_detect,
            &risk_issue_reader,
            &risk_issue_writer,
        )
        .await
        .map_err(|err| risk_issue_error_response(err, "Failed to update risk or issue"))?;

    Ok(Json(dto::risk_issue::RiskIssue::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/risks-issues/{id}",
    tag = RISK_ISSUE_API_GROUP,
    params(("id" = i32, Path, description = "Identifier of the risk or issue")),
    responses(
        (status = 200, description = "Risk or issue deleted", body = dto::MessageResponse),
        (status = 404, description = "No such risk or issue", body = BasicErrorResponse),
        (status = 500, description = "Risk or issue could not be deleted", body = BasicErrorResponse),
    ),
)]
/// Deletes a risk or issue
async fn delete_risk_issue(
    risk_issue_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    risk_issue_service: &impl RiskIssuePort,
) -> Result<Json<dto::MessageResponse>, ErrorResponse> {
    info!("Deleting risk or issue {risk_issue_id}");
    let risk_issue_writer = persistence::db_risk_issue_driven_ports::DbRiskIssueWriter {};

    risk_issue_service
        .delete_risk_issue(risk_issue_id, &mut *ext_cxn, &risk_issue_writer)
        .await
        .map_err(|err| risk_issue_error_response(err, "Failed to delete risk or issue"))?;

    Ok(Json(dto::MessageResponse::new("Risk or issue deleted successfully")))
}
