//! List views over the API's resources. Each view keeps its own copy of the records and
//! fetches them again after every change it makes.

use crate::client::session::SessionStore;
use crate::client::{ApiClient, ClientError};
use crate::dto;
use std::sync::Arc;

/// A kind of record the API can list, create and remove
pub trait Resource {
    type Record: Clone;
    type New;
    type Filter: Default;
    /// Name used in notices, such as "Task"
    const LABEL: &'static str;

    async fn fetch_all<S: SessionStore>(
        client: &ApiClient<S>,
        filter: &Self::Filter,
    ) -> Result<Vec<Self::Record>, ClientError>;
    async fn create<S: SessionStore>(
        client: &ApiClient<S>,
        new_record: &Self::New,
    ) -> Result<Self::Record, ClientError>;
    async fn remove<S: SessionStore>(client: &ApiClient<S>, id: i32) -> Result<(), ClientError>;
}

/// A [Resource] whose records can also be changed in place
pub trait EditableResource: Resource {
    type Update;

    async fn update<S: SessionStore>(
        client: &ApiClient<S>,
        id: i32,
        update: &Self::Update,
    ) -> Result<Self::Record, ClientError>;
}

pub struct Tasks;

impl Resource for Tasks {
    type Record = dto::task::Task;
    type New = dto::task::NewTask;
    type Filter = dto::task::TaskListQuery;
    const LABEL: &'static str = "Task";

    async fn fetch_all<S: SessionStore>(
        client: &ApiClient<S>,
        filter: &Self::Filter,
    ) -> Result<Vec<Self::Record>, ClientError> {
        client.list_tasks(filter).await
    }

    async fn create<S: SessionStore>(
        client: &ApiClient<S>,
        new_record: &Self::New,
    ) -> Result<Self::Record, ClientError> {
        client.create_task(new_record).await
    }

    async fn remove<S: SessionStore>(client: &ApiClient<S>, id: i32) -> Result<(), ClientError> {
        client.delete_task(id).await.map(|_| ())
    }
}

impl EditableResource for Tasks {
    type Update = dto::task::UpdateTask;

    async fn update<S: SessionStore>(
        client: &ApiClient<S>,
        id: i32,
        update: &Self::Update,
    ) -> Result<Self::Record, ClientError> {
        client.update_task(id, update).await
    }
}

pub struct Projects;

impl Resource for Projects {
    type Record = dto::project::Project;
    type New = dto::project::NewProject;
    type Filter = dto::project::ProjectListQuery;
    const LABEL: &'static str = "Project";

    async fn fetch_all<S: SessionStore>(
        client: &ApiClient<S>,
        filter: &Self::Filter,
    ) -> Result<Vec<Self::Record>, ClientError> {
        client.list_projects(filter).await
    }

    async fn create<S: SessionStore>(
        client: &ApiClient<S>,
        new_record: &Self::New,
    ) -> Result<Self::Record, ClientError> {
        client.create_project(new_record).await
    }

    async fn remove<S: SessionStore>(client: &ApiClient<S>, id: i32) -> Result<(), ClientError> {
        client.delete_project(id).await.map(|_| ())
    }
}

impl EditableResource for Projects {
    type Update = dto::project::UpdateProject;

    async fn update<S: SessionStore>(
        client: &ApiClient<S>,
        id: i32,
        update: &Self::Update,
    ) -> Result<Self::Record, ClientError> {
        client.update_project(id, update).await
    }
}

pub struct Users;

impl Resource for Users {
    type Record = dto::user::User;
    type New = dto::user::NewUser;
    type Filter = ();
    const LABEL: &'static str = "User";

    async fn fetch_all<S: SessionStore>(
        client: &ApiClient<S>,
        _filter: &Self::Filter,
    ) -> Result<Vec<Self::Record>, ClientError> {
        client.list_users().await
    }

    async fn create<S: SessionStore>(
        client: &ApiClient<S>,
        new_record: &Self::New,
    ) -> Result<Self::Record, ClientError> {
        client.create_user(new_record).await
    }

    async fn remove<S: SessionStore>(client: &ApiClient<S>, id: i32) -> Result<(), ClientError> {
        client.delete_user(id).await.map(|_| ())
    }
}

pub struct RisksIssues;

impl Resource for RisksIssues {
    type Record = dto::risk_issue::RiskIssue;
    type New = dto::risk_issue::NewRiskIssue;
    type Filter = dto::risk_issue::RiskIssueListQuery;
    const LABEL: &'static str = "Risk or issue";

    async fn fetch_all<S: SessionStore>(
        client: &ApiClient<S>,
        filter: &Self::Filter,
    ) -> Result<Vec<Self::Record>, ClientError> {
        client.list_risks_issues(filter).await
    }

    async fn create<S: SessionStore>(
        client: &ApiClient<S>,
        new_record: &Self::New,
    ) -> Result<Self::Record, ClientError> {
        client.create_risk_issue(new_record).await
    }

    async fn remove<S: SessionStore>(client: &ApiClient<S>, id: i32) -> Result<(), ClientError> {
        client.delete_risk_issue(id).await.map(|_| ())
    }
}

impl EditableResource for RisksIssues {
    type Update = dto::risk_issue::UpdateRiskIssue;

    async fn update<S: SessionStore>(
        client: &ApiClient<S>,
        id: i32,
        update: &Self::Update,
    ) -> Result<Self::Record, ClientError> {
        client.update_risk_issue(id, update).await
    }
}

/// Outcome of the last operation, meant to be shown next to the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// The records of one resource as last fetched, plus the outcome of the last operation
pub struct ResourceList<R: Resource, S: SessionStore> {
    client: Arc<ApiClient<S>>,
    filter: R::Filter,
    records: Vec<R::Record>,
    notice: Option<Notice>,
}

impl<R: Resource, S: SessionStore> ResourceList<R, S> {
    /// Creates an empty view. Nothing is fetched until [ResourceList::refresh] is called.
    pub fn new(client: Arc<ApiClient<S>>) -> Self {
        ResourceList {
            client,
            filter: R::Filter::default(),
            records: Vec::new(),
            notice: None,
        }
    }

    /// Replaces the filter used by later fetches
    pub fn set_filter(&mut self, filter: R::Filter) {
        self.filter = filter;
    }

    pub fn records(&self) -> &[R::Record] {
        &self.records
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Fetches the list again using the current filter
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        match R::fetch_all(&self.client, &self.filter).await {
            Ok(records) => {
                self.records = records;
                Ok(())
            }
            Err(err) => {
                self.notice = Some(Notice::Error(err.display_message()));
                Err(err)
            }
        }
    }

    /// Records the outcome of a change, then refetches if the change went through
    async fn finish_change<T>(
        &mut self,
        outcome: Result<T, ClientError>,
        success_message: String,
    ) -> Result<T, ClientError> {
        match outcome {
            Ok(value) => {
                self.notice = Some(Notice::Success(success_message));
                self.refresh().await?;
                Ok(value)
            }
            Err(err) => {
                self.notice = Some(Notice::Error(err.display_message()));
                Err(err)
            }
        }
    }

    pub async fn create(&mut self, new_record: &R::New) -> Result<R::Record, ClientError> {
        let outcome = R::create(&self.client, new_record).await;
        self.finish_change(outcome, format!("{} created successfully", R::LABEL))
            .await
    }

    pub async fn remove(&mut self, id: i32) -> Result<(), ClientError> {
        let outcome = R::remove(&self.client, id).await;
        self.finish_change(outcome, format!("{} deleted successfully", R::LABEL))
            .await
    }
}

impl<R: EditableResource, S: SessionStore> ResourceList<R, S> {
    pub async fn update(&mut self, id: i32, update: &R::Update) -> Result<R::Record, ClientError> {
        let outcome = R::update(&self.client, id, update).await;
        self.finish_change(outcome, format!("{} updated successfully", R::LABEL))
            .await
    }
}
