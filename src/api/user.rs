use crate::domain::user::driving_ports::{UserError, UserPort};
use crate::external_connections::ExternalConnectivity;
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
#[openapi(paths(get_users, create_user, get_user, delete_user))]
/// Defines the OpenAPI documentation for the user API
pub struct UsersApi;
/// Constant used to group user endpoints in OpenAPI documentation
pub const USER_API_GROUP: &str = "Users";

/// Builds a router for all the user routes
pub fn user_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/",
            get(|State(app_state): AppState| async move {
                let mut ext_cxn = app_state.ext_cxn.clone();
                let user_service = domain::user::UserService {};

                get_users(&mut ext_cxn, &user_service).await
            })
            .post(
                |State(app_state): AppState, Json(new_user): Json<dto::user::NewUser>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let user_service = domain::user::UserService {};

                    create_user(new_user, &mut ext_cxn, &user_service).await
                },
            ),
        )
        .route(
            "/:user_id",
            get(
                |State(app_state): AppState, Path(user_id): Path<i32>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let user_service = domain::user::UserService {};

                    get_user(user_id, &mut ext_cxn, &user_service).await
                },
            )
            .delete(
                |State(app_state): AppState, Path(user_id): Path<i32>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();
                    let user_service = domain::user::UserService {};

                    delete_user(user_id, &mut ext_cxn, &user_service).await
                },
            ),
        )
}

fn user_error_response(err: UserError, failure_message: &'static str) -> ErrorResponse {
    match err {
        UserError::Invalid(errors) => ValidationErrorResponse::from(errors).into(),
        UserError::NotFound => NotFoundResponse("User").into(),
        UserError::PortError(cause) => {
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
    path = "/users",
    tag = USER_API_GROUP,
    responses(
        (status = 200, description = "All users", body = Vec<dto::user::User>),
        (status = 500, description = "Users could not be fetched", body = BasicErrorResponse),
    ),
)]
/// Retrieves a list of all the users in the system.
async fn get_users(
    ext_cxn: &mut impl ExternalConnectivity,
    user_service: &impl UserPort,
) -> Result<Json<Vec<dto::user::User>>, ErrorResponse> {
    info!("Requested users");
    let user_reader = persistence::db_user_driven_ports::DbReadUsers {};

    let users = user_service
        .get_users(&mut *ext_cxn, &user_reader)
        .await
        .map_err(|err| user_error_response(err, "Failed to fetch users"))?;

    Ok(Json(users.into_iter().map(dto::user::User::from).collect()))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = USER_API_GROUP,
    request_body = dto::user::NewUser,
    responses(
        (status = 201, description = "User created", body = dto::user::User),
        (status = 422, description = "Invalid user data or email already taken", body = BasicErrorResponse),
        (status = 500, description = "User could not be created", body = BasicErrorResponse),
    ),
)]
/// Creates a user.
async fn create_user(
    new_user: dto::user::NewUser,
    ext_cxn: &mut impl ExternalConnectivity,
    user_service: &impl UserPort,
) -> Result<(StatusCode, Json<dto::user::User>), ErrorResponse> {
    info!("Attempt to create user");
    let new_user =
        domain::user::CreateUser::try_from(new_user).map_err(ValidationErrorResponse::from)?;
    let user_detect = persistence::db_user_driven_ports::DbDetectUser {};
    let user_writer = persistence::db_user_driven_ports::DbWriteUsers {};
    let user_reader = persistence::db_user_driven_ports::DbReadUsers {};

    let created = user_service
        .create_user(
            &new_user,
            &mut *ext_cxn,
            &user_detect,
            &user_writer,
            &user_reader,
        )
        .await
        .map_err(|err| user_error_response(err, "Failed to create user"))?;

    Ok((StatusCode::CREATED, Json(dto::user::User::from(created))))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = USER_API_GROUP,
    params(("id" = i32, Path, description = "Identifier of the user")),
    responses(
        (status = 200, description = "The requested user", body = dto::user::User),
        (status = 404, description = "No such user", body = BasicErrorResponse),
        (status = 500, description = "User could not be fetched", body = BasicErrorResponse),
    ),
)]
/// Retrieves one user
async fn get_user(
    user_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    user_service: &impl UserPort,
) -> Result<Json<dto::user::User>, ErrorResponse> {
    info!("Fetching user {user_id}");
    let user_reader = persistence::db_user_driven_ports::DbReadUsers {};

    let user = user_service
        .user_by_id(user_id, &mut *ext_cxn, &user_reader)
        .await
        .map_err(|err| user_error_response(err, "Failed to fetch user"))?;

    Ok(Json(dto::user::User::from(user)))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = USER_API_GROUP,
    params(("id" = i32, Path, description = "Identifier of the user")),
    responses(
        (status = 200, description = "User deleted. Their tasks become unassigned.", body = dto::MessageResponse),
        (status = 404, description = "No such user", body = BasicErrorResponse),
        (status = 500, description = "User could not be deleted", body = BasicErrorResponse),
    ),
)]
/// Deletes a user. Tasks assigned to them and projects they manage are kept.
async fn delete_user(
    user_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    user_service: &impl UserPort,
) -> Result<Json<dto::MessageResponse>, ErrorResponse> {
    info!("Deleting user {user_id}");
    let user_writer = persistence::db_user_driven_ports::DbWriteUsers {};

    user_service
        .delete_user(user_id, &mut *ext_cxn, &user_writer)
        .await
        .map_err(|err| user_error_response(err, "Failed to delete user"))?;

    Ok(Json(dto::MessageResponse::new("User deleted successfully")))
}
