use crate::dto;
use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(info(
    title = "Project Tracker API",
    description = "Tracks projects, their tasks, the time logged against them and their risks"
))]
struct ProjectTrackerApi;

/// Constructs the route on the API that renders the swagger UI and returns the OpenAPI schema.
/// Merges in OpenAPI definitions from other locations in the app, such as the [dto] package
/// and submodules of [api][crate::api]
pub fn build_documentation() -> SwaggerUi {
    let mut api_docs = ProjectTrackerApi::openapi();
    api_docs.merge(dto::OpenApiSchemas::openapi());
    api_docs.merge(super::task::TaskApi::openapi());
    api_docs.merge(super::project::ProjectApi::openapi());
    api_docs.merge(super::user::UsersApi::openapi());
    api_docs.merge(super::dashboard::DashboardApi::openapi());
    api_docs.merge(super::time_entry::TimeEntryApi::openapi());
    api_docs.merge(super::risk_issue::RiskIssueApi::openapi());

    if let Some(components) = api_docs.components.as_mut() {
        components.add_security_scheme(
            "bearer_token",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }

    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api_docs)
}
