//! Typed access to the project tracker API for other Rust programs.
//!
//! Every request carries the JSON and XHR default headers plus the session's bearer token.
//! A 401 clears the session's token and asks it for a fresh login, and a 500 gets logged.

pub mod resource;
pub mod session;

use crate::dto;
use crate::routing_utils::BasicErrorResponse;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_tracing::TracingMiddleware;
use serde::de::DeserializeOwned;
use session::SessionStore;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("the session is not authenticated")]
    Unauthorized,
    #[error("the API responded with {status}: {message}")]
    Api {
        status: StatusCode,
        message: String,
        errors: BTreeMap<String, Vec<String>>,
    },
    #[error("could not complete the request")]
    Transport(#[from] reqwest_middleware::Error),
    #[error("the API response could not be read")]
    InvalidResponse(#[source] reqwest::Error),
}

impl ClientError {
    /// The message to show a person when this error ends an operation. API errors
    /// report the server's own message.
    pub fn display_message(&self) -> String {
        match self {
            ClientError::Unauthorized => "Unauthenticated.".to_owned(),
            ClientError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Client for the project tracker API. Build one and share it between consumers.
pub struct ApiClient<S: SessionStore> {
    base_url: String,
    http_client: ClientWithMiddleware,
    session: S,
}

impl<S: SessionStore> ApiClient<S> {
    pub fn new(base_url: impl Into<String>, session: S) -> Result<Self, ClientError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        default_headers.insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );
        let base_client = reqwest::Client::builder()
            .use_rustls_tls()
            .default_headers(default_headers)
            .build()
            .map_err(ClientError::InvalidResponse)?;
        let http_client = ClientBuilder::new(base_client)
            .with(TracingMiddleware::default())
            .build();

        Ok(ApiClient {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            http_client,
            session,
        })
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attaches the session's token, sends the request and turns the response into either
    /// the expected body or a [ClientError]
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let request = match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(ClientError::InvalidResponse);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            debug!("API rejected the session, login required");
            self.session.clear_token();
            self.session.login_required();
            return Err(ClientError::Unauthorized);
        }
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(body = %body, "API server error");
        }

        let details: Option<BasicErrorResponse> = serde_json::from_str(&body).ok();
        let (message, errors) = match details {
            Some(details) => (details.message, details.errors.unwrap_or_default()),
            None => (
                status
                    .canonical_reason()
                    .unwrap_or("Unexpected response")
                    .to_owned(),
                BTreeMap::new(),
            ),
        };
        Err(ClientError::Api {
            status,
            message,
            errors,
        })
    }

    pub async fn list_tasks(
        &self,
        query: &dto::task::TaskListQuery,
    ) -> Result<Vec<dto::task::Task>, ClientError> {
        self.send(self.http_client.get(self.url("/tasks")).query(query))
            .await
    }

    pub async fn get_task(&self, id: i32) -> Result<dto::task::Task, ClientError> {
        self.send(self.http_client.get(self.url(&format!("/tasks/{id}"))))
            .await
    }

    pub async fn create_task(
        &self,
        new_task: &dto::task::NewTask,
    ) -> Result<dto::task::Task, ClientError> {
        self.send(self.http_client.post(self.url("/tasks")).json(new_task))
            .await
    }

    pub async fn update_task(
        &self,
        id: i32,
        update: &dto::task::UpdateTask,
    ) -> Result<dto::task::Task, ClientError> {
        self.send(
            self.http_client
                .put(self.url(&format!("/tasks/{id}")))
                .json(update),
        )
        .await
    }

    pub async fn delete_task(&self, id: i32) -> Result<dto::MessageResponse, ClientError> {
        self.send(self.http_client.delete(self.url(&format!("/tasks/{id}"))))
            .await
    }

    pub async fn list_projects(
        &self,
        query: &dto::project::ProjectListQuery,
    ) -> Result<Vec<dto::project::Project>, ClientError> {
        self.send(self.http_client.get(self.url("/projects")).query(query))
            .await
    }

    pub async fn get_project(&self, id: i32) -> Result<dto::project::Project, ClientError> {
        self.send(self.http_client.get(self.url(&format!("/projects/{id}"))))
            .await
    }

    pub async fn create_project(
        &self,
        new_project: &dto::project::NewProject,
    ) -> Result<dto::project::Project, ClientError> {
        self.send(self.http_client.post(self.url("/projects")).json(new_project))
            .await
    }

    pub async fn update_project(
        &self,
        id: i32,
        update: &dto::project::UpdateProject,
    ) -> Result<dto::project::Project, ClientError> {
        self.send(
            self.http_client
                .put(self.url(&format!("/projects/{id}")))
                .json(update),
        )
        .await
    }

    pub async fn delete_project(&self, id: i32) -> Result<dto::MessageResponse, ClientError> {
        self.send(self.http_client.delete(self.url(&format!("/projects/{id}"))))
            .await
    }

    pub async fn project_tasks(
        &self,
        id: i32,
        sort: &dto::task::TaskSortQuery,
    ) -> Result<Vec<dto::task::Task>, ClientError> {
        self.send(
            self.http_client
                .get(self.url(&format!("/projects/{id}/tasks")))
                .query(sort),
        )
        .await
    }

    pub async fn project_budget(
        &self,
        id: i32,
    ) -> Result<dto::project::BudgetSummary, ClientError> {
        self.send(
            self.http_client
                .get(self.url(&format!("/projects/{id}/budget"))),
        )
        .await
    }

    pub async fn list_users(&self) -> Result<Vec<dto::user::User>, ClientError> {
        self.send(self.http_client.get(self.url("/users"))).await
    }

    pub async fn get_user(&self, id: i32) -> Result<dto::user::User, ClientError> {
        self.send(self.http_client.get(self.url(&format!("/users/{id}"))))
            .await
    }

    pub async fn create_user(
        &self,
        new_user: &dto::user::NewUser,
    ) -> Result<dto::user::User, ClientError> {
        self.send(self.http_client.post(self.url("/users")).json(new_user))
            .await
    }

    pub async fn delete_user(&self, id: i32) -> Result<dto::MessageResponse, ClientError> {
        self.send(self.http_client.delete(self.url(&format!("/users/{id}"))))
            .await
    }

    pub async fn list_time_entries(
        &self,
        task_id: i32,
    ) -> Result<Vec<dto::time_entry::TimeEntry>, ClientError> {
        self.send(
            self.http_client
                .get(self.url(&format!("/tasks/{task_id}/time-entries"))),
        )
        .await
    }

    pub async fn get_time_entry(
        &self,
        task_id: i32,
        id: i32,
    ) -> Result<dto::time_entry::TimeEntry, ClientError> {
        self.send(
            self.http_client
                .get(self.url(&format!("/tasks/{task_id}/time-entries/{id}"))),
        )
        .await
    }

    pub async fn create_time_entry(
        &self,
        task_id: i32,
        new_entry: &dto::time_entry::NewTimeEntry,
    ) -> Result<dto::time_entry::TimeEntry, ClientError> {
        self.send(
            self.http_client
                .post(self.url(&format!("/tasks/{task_id}/time-entries")))
                .json(new_entry),
        )
        .await
    }

    pub async fn update_time_entry(
        &self,
        task_id: i32,
        id: i32,
        update: &dto::time_entry::UpdateTimeEntry,
    ) -> Result<dto::time_entry::TimeEntry, ClientError> {
        self.send(
            self.http_client
                .patch(self.url(&format!("/tasks/{task_id}/time-entries/{id}")))
                .json(update),
        )
        .await
    }

    pub async fn delete_time_entry(
        &self,
        task_id: i32,
        id: i32,
    ) -> Result<dto::MessageResponse, ClientError> {
        self.send(
            self.http_client
                .delete(self.url(&format!("/tasks/{task_id}/time-entries/{id}"))),
        )
        .await
    }

    pub async fn list_risks_issues(
        &self,
        query: &dto::risk_issue::RiskIssueListQuery,
    ) -> Result<Vec<dto::risk_issue::RiskIssue>, ClientError> {
        self.send(self.http_client.get(self.url("/risks-issues")).query(query))
            .await
    }

    pub async fn get_risk_issue(&self, id: i32) -> Result<dto::risk_issue::RiskIssue, ClientError> {
        self.send(self.http_client.get(self.url(&format!("/risks-issues/{id}"))))
            .await
    }

    pub async fn create_risk_issue(
        &self,
        new_risk_issue: &dto::risk_issue::NewRiskIssue,
    ) -> Result<dto::risk_issue::RiskIssue, ClientError> {
        self.send(
            self.http_client
                .post(self.url("/risks-issues"))
                .json(new_risk_issue),
        )
        .await
    }

    pub async fn update_risk_issue(
        &self,
        id: i32,
        update: &dto::risk_issue::UpdateRiskIssue,
    ) -> Result<dto::risk_issue::RiskIssue, ClientError> {
        self.send(
            self.http_client
                .put(self.url(&format!("/risks-issues/{id}")))
                .json(update),
        )
        .await
    }

    pub async fn delete_risk_issue(&self, id: i32) -> Result<dto::MessageResponse, ClientError> {
        self.send(self.http_client.delete(self.url(&format!("/risks-issues/{id}"))))
            .await
    }

    pub async fn dashboard_stats(&self) -> Result<dto::dashboard::DashboardStats, ClientError> {
        self.send(self.http_client.get(self.url("/dashboard/stats")))
            .await
    }

    pub async fn upcoming_tasks(&self) -> Result<Vec<dto::task::Task>, ClientError> {
        self.send(self.http_client.get(self.url("/dashboard/upcoming-tasks")))
            .await
    }
}
