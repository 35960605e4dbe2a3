use axum::Router;
use axum::extract::State;
use std::sync::Arc;

pub mod api;
pub mod app_env;
pub mod client;
pub mod db;
pub mod domain;
pub mod dto;
pub mod external_connections;
pub mod logging;
pub mod persistence;
pub mod routing_utils;

/// Data shared with every request handler
pub struct SharedData {
    pub ext_cxn: persistence::ExternalConnectivity,
    pub require_bearer_token: bool,
}

/// Extractor used by route closures to reach [SharedData]
pub type AppState = State<Arc<SharedData>>;

/// Assembles every API route, guarding them with bearer token checks when configured to.
/// The Swagger UI and OpenAPI document stay reachable without a token.
pub fn build_router(shared_data: Arc<SharedData>) -> Router {
    let mut api_routes = Router::new()
        .nest(
            "/tasks",
            api::task::task_routes().merge(api::time_entry::time_entry_routes()),
        )
        .nest("/projects", api::project::project_routes())
        .nest("/risks-issues", api::risk_issue::risk_issue_routes())
        .nest("/users", api::user::user_routes())
        .nest("/dashboard", api::dashboard::dashboard_routes());
    if shared_data.require_bearer_token {
        api_routes = api_routes.layer(axum::middleware::from_fn(api::auth::require_bearer_token));
    }

    let router = api_routes
        .merge(api::swagger_main::build_documentation())
        .with_state(shared_data);

    logging::attach_tracing_http(router)
}
