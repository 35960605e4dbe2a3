use crate::domain;
use crate::domain::UnrecognizedValue;
use crate::domain::project::driven_ports::DetectProject;
use crate::domain::risk_issue::driving_ports::RiskIssueError;
use crate::domain::user::{UserExistsErr, driven_ports::DetectUser};
use crate::external_connections::{
    ExternalConnectivity, TransactableExternalConnectivity, TransactionHandle,
};
use anyhow::Context;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// Whether the record tracks something that might go wrong or something that already has
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RiskIssueType {
    #[default]
    #[display("risk")]
    Risk,
    #[display("issue")]
    Issue,
}

impl FromStr for RiskIssueType {
    type Err = UnrecognizedValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "risk" => Ok(Self::Risk),
            "issue" => Ok(Self::Issue),
            _ => Err(UnrecognizedValue(value.to_owned())),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Display, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskSeverity {
    #[default]
    #[display("low")]
    Low,
    #[display("medium")]
    Medium,
    #[display("high")]
    High,
    #[display("critical")]
    Critical,
}

impl FromStr for RiskSeverity {
    type Err = UnrecognizedValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(UnrecognizedValue(value.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RiskIssueStatus {
    #[default]
    #[display("open")]
    Open,
    #[display("in_progress")]
    InProgress,
    #[display("resolved")]
    Resolved,
    #[display("closed")]
    Closed,
}

impl FromStr for RiskIssueStatus {
    type Err = UnrecognizedValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            _ => Err(UnrecognizedValue(value.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskIssue {
    pub id: i32,
    pub project_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub kind: RiskIssueType,
    pub severity: RiskSeverity,
    pub status: RiskIssueStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRiskIssue {
    pub project_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub kind: RiskIssueType,
    pub severity: RiskSeverity,
    pub status: RiskIssueStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<i32>,
}

/// A partial update to a risk or issue. `description`, `due_date` and `assigned_to` can be cleared.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RiskIssueUpdate {
    pub project_id: Option<i32>,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub kind: Option<RiskIssueType>,
    pub severity: Option<RiskSeverity>,
    pub status: Option<RiskIssueStatus>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub assigned_to: Option<Option<i32>>,
}

impl RiskIssueUpdate {
    pub fn changes_from(&self, current: &RiskIssue) -> RiskIssueUpdate {
        RiskIssueUpdate {
            project_id: domain::changed(&self.project_id, &current.project_id),
            title: domain::changed(&self.title, &current.title),
            description: domain::changed(&self.description, &current.description),
            kind: domain::changed(&self.kind, &current.kind),
            severity: domain::changed(&self.severity, &current.severity),
            status: domain::changed(&self.status, &current.status),
            due_date: domain::changed(&self.due_date, &current.due_date),
            assigned_to: domain::changed(&self.assigned_to, &current.assigned_to),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == RiskIssueUpdate::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RiskIssueFilter {
    pub project_id: Option<i32>,
    pub kind: Option<RiskIssueType>,
    pub status: Option<RiskIssueStatus>,
}

pub mod driven_ports {
    use super::*;

    pub trait RiskIssueReader {
        /// Matching records in ascending id order
        async fn all(
            &self,
            filter: &RiskIssueFilter,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<RiskIssue>, anyhow::Error>;
        async fn by_id(
            &self,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<RiskIssue>, anyhow::Error>;
    }

    pub trait RiskIssueWriter {
        async fn create_risk_issue(
            &self,
            risk_issue: &NewRiskIssue,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<i32, anyhow::Error>;
        async fn update_risk_issue(
            &self,
            id: i32,
            update: &RiskIssueUpdate,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;
        async fn delete_risk_issue(
            &self,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use thiserror::Error;
    use validator::ValidationErrors;

    #[derive(Debug, Error)]
    pub enum RiskIssueError {
        #[error("risk or issue input was invalid: {0}")]
        Invalid(ValidationErrors),
        #[error("the requested risk or issue does not exist")]
        NotFound,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    impl From<UserExistsErr> for RiskIssueError {
        fn from(value: UserExistsErr) -> Self {
            match value {
                UserExistsErr::UserDoesNotExist(_) => RiskIssueError::Invalid(domain::field_error(
                    "assigned_to",
                    "exists",
                    "The selected assigned to is invalid.",
                )),
                UserExistsErr::PortError(err) => {
                    RiskIssueError::PortError(err.context("verifying risk or issue owner"))
                }
            }
        }
    }

    pub trait RiskIssuePort {
        async fn list_risks_issues(
            &self,
            filter: &RiskIssueFilter,
            ext_cxn: &mut impl ExternalConnectivity,
            ri_read: &impl driven_ports::RiskIssueReader,
        ) -> Result<Vec<RiskIssue>, RiskIssueError>;
        async fn risk_issue_by_id(
            &self,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            ri_read: &impl driven_ports::RiskIssueReader,
        ) -> Result<RiskIssue, RiskIssueError>;
        async fn create_risk_issue(
            &self,
            risk_issue: &NewRiskIssue,
            ext_cxn: &mut impl ExternalConnectivity,
            p_detect: &impl DetectProject,
            u_detect: &impl DetectUser,
            ri_write: &impl driven_ports::RiskIssueWriter,
            ri_read: &impl driven_ports::RiskIssueReader,
        ) -> Result<RiskIssue, RiskIssueError>;
        async fn update_risk_issue(
            &self,
            id: i32,
            update: &RiskIssueUpdate,
            ext_cxn: &mut impl TransactableExternalConnectivity,
            p_detect: &impl DetectProject,
            u_detect: &impl DetectUser,
            ri_read: &impl driven_ports::RiskIssueReader,
            ri_write: &impl driven_ports::RiskIssueWriter,
        ) -> Result<RiskIssue, RiskIssueError>;
        async fn delete_risk_issue(
            &self,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            ri_write: &impl driven_ports::RiskIssueWriter,
        ) -> Result<(), RiskIssueError>;
    }
}

async fn verify_project_reference(
    project_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    p_detect: &impl DetectProject,
) -> Result<(), RiskIssueError> {
    let exists = p_detect
        .project_exists(project_id, ext_cxn)
        .await
        .context("verifying risk or issue project")?;

    if exists {
        Ok(())
    } else {
        Err(RiskIssueError::Invalid(domain::field_error(
            "project_id",
            "exists",
            "The selected project id is invalid.",
        )))
    }
}

pub struct RiskIssueService {}

impl driving_ports::RiskIssuePort for RiskIssueService {
    async fn list_risks_issues(
        &self,
        filter: &RiskIssueFilter,
        ext_cxn: &mut impl ExternalConnectivity,
        ri_read: &impl driven_ports::RiskIssueReader,
    ) -> Result<Vec<RiskIssue>, RiskIssueError> {
        let risks_issues = ri_read
            .all(filter, ext_cxn)
            .await
            .context("listing risks and issues")?;

        Ok(risks_issues)
    }

    async fn risk_issue_by_id(
        &self,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        ri_read: &impl driven_ports::RiskIssueReader,
    ) -> Result<RiskIssue, RiskIssueError> {
        ri_read
            .by_id(id, ext_cxn)
            .await
            .context("fetching a risk or issue by id")?
            .ok_or(RiskIssueError::NotFound)
    }

    async fn create_risk_issue(
        &self,
        risk_issue: &NewRiskIssue,
        ext_cxn: &mut impl ExternalConnectivity,
        p_detect: &impl DetectProject,
        u_detect: &impl DetectUser,
        ri_write: &impl driven_ports::RiskIssueWriter,
        ri_read: &impl driven_ports::RiskIssueReader,
    ) -> Result<RiskIssue, RiskIssueError> {
        verify_project_reference(risk_issue.project_id, &mut *ext_cxn, p_detect).await?;
        if let Some(assigned_to) = risk_issue.assigned_to {
            domain::user::verify_user_exists(assigned_to, &mut *ext_cxn, u_detect).await?;
        }

        let new_id = ri_write
            .create_risk_issue(risk_issue, &mut *ext_cxn)
            .await
            .context("creating a risk or issue")?;
        tracing::debug!(risk_issue_id = new_id, kind = %risk_issue.kind, "Recorded risk or issue");

        ri_read
            .by_id(new_id, ext_cxn)
            .await
            .context("reading back a newly created risk or issue")?
            .ok_or_else(|| {
                RiskIssueError::PortError(anyhow::anyhow!("risk or issue {new_id} vanished after insert"))
            })
    }

    async fn update_risk_issue(
        &self,
        id: i32,
        update: &RiskIssueUpdate,
        ext_cxn: &mut impl TransactableExternalConnectivity,
        p_detect: &impl DetectProject,
        u_detect: &impl DetectUser,
        ri_read: &impl driven_ports::RiskIssueReader,
        ri_write: &impl driven_ports::RiskIssueWriter,
    ) -> Result<RiskIssue, RiskIssueError> {
        let mut txn = ext_cxn
            .start_transaction()
            .await
            .context("starting risk or issue update transaction")?;

        let current = ri_read
            .by_id(id, &mut txn)
            .await
            .context("fetching risk or issue to update")?
            .ok_or(RiskIssueError::NotFound)?;

        if let Some(project_id) = update.project_id {
            verify_project_reference(project_id, &mut txn, p_detect).await?;
        }
        if let Some(Some(assigned_to)) = update.assigned_to {
            domain::user::verify_user_exists(assigned_to, &mut txn, u_detect).await?;
        }

        let changes = update.changes_from(&current);
        if changes.is_empty() {
            tracing::debug!(risk_issue_id = id, "Risk or issue update made no changes");
            return Ok(current);
        }

        ri_write
            .update_risk_issue(id, &changes, &mut txn)
            .await
            .context("updating a risk or issue")?;
        let updated = ri_read
            .by_id(id, &mut txn)
            .await
            .context("reading back an updated risk or issue")?
            .ok_or(RiskIssueError::NotFound)?;
        txn.commit().await.context("committing risk or issue update")?;

        Ok(updated)
    }

    async fn delete_risk_issue(
        &self,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        ri_write: &impl driven_ports::RiskIssueWriter,
    ) -> Result<(), RiskIssueError> {
        let removed = ri_write
            .delete_risk_issue(id, ext_cxn)
            .await
            .context("deleting a risk or issue")?;

        if removed {
            Ok(())
        } else {
            Err(RiskIssueError::NotFound)
        }
    }
}


#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use crate::domain::test_util::{FakeImplementation, fixed_time};
    use std::sync::Mutex;

    pub fn new_risk_issue_default(project_id: i32) -> NewRiskIssue {
        NewRiskIssue {
            project_id,
            title: "Vendor may miss the launch date".to_owned(),
            description: None,
            kind: RiskIssueType::Risk,
            severity: RiskSeverity::High,
            status: RiskIssueStatus::Open,
            due_date: Some(fixed_time()),
            assigned_to: None,
        }
    }

    pub fn risk_issue_default(id: i32) -> RiskIssue {
        let new_risk = new_risk_issue_default(1);
        RiskIssue {
            id,
            project_id: new_risk.project_id,
            title: new_risk.title,
            description: new_risk.description,
            kind: new_risk.kind,
            severity: new_risk.severity,
            status: new_risk.status,
            due_date: new_risk.due_date,
            assigned_to: new_risk.assigned_to,
            created_at: fixed_time(),
            updated_at: fixed_time(),
        }
    }

    impl Clone for RiskIssueError {
        fn clone(&self) -> Self {
            match self {
                Self::Invalid(errors) => Self::Invalid(errors.clone()),
                Self::NotFound => Self::NotFound,
                Self::PortError(err) => Self::PortError(anyhow::anyhow!(format!("{err}"))),
            }
        }
    }

    pub struct MockRiskIssueService {
        pub list_risks_issues_result:
            FakeImplementation<RiskIssueFilter, Result<Vec<RiskIssue>, RiskIssueError>>,
        pub risk_issue_by_id_result: FakeImplementation<i32, Result<RiskIssue, RiskIssueError>>,
        pub create_risk_issue_result:
            FakeImplementation<NewRiskIssue, Result<RiskIssue, RiskIssueError>>,
        pub update_risk_issue_result:
            FakeImplementation<(i32, RiskIssueUpdate), Result<RiskIssue, RiskIssueError>>,
        pub delete_risk_issue_result: FakeImplementation<i32, Result<(), RiskIssueError>>,
    }

    impl MockRiskIssueService {
        pub fn new() -> MockRiskIssueService {
            MockRiskIssueService {
                list_risks_issues_result: FakeImplementation::new(),
                risk_issue_by_id_result: FakeImplementation::new(),
                create_risk_issue_result: FakeImplementation::new(),
                update_risk_issue_result: FakeImplementation::new(),
                delete_risk_issue_result: FakeImplementation::new(),
            }
        }

        pub fn new_locked() -> Mutex<MockRiskIssueService> {
            Mutex::new(Self::new())
        }
    }

    impl driving_ports::RiskIssuePort for Mutex<MockRiskIssueService> {
        async fn list_risks_issues(
            &self,
            filter: &RiskIssueFilter,
            _ext_cxn: &mut impl ExternalConnectivity,
            _ri_read: &impl driven_ports::RiskIssueReader,
        ) -> Result<Vec<RiskIssue>, RiskIssueError> {
            let mut locked_self = self.lock().expect("mock risk issue service mutex poisoned");
            locked_self.list_risks_issues_result.save_arguments(filter.clone());

            locked_self.list_risks_issues_result.return_value_result()
        }

        async fn risk_issue_by_id(
            &self,
            id: i32,
            _ext_cxn: &mut impl ExternalConnectivity,
            _ri_read: &impl driven_ports::RiskIssueReader,
        ) -> Result<RiskIssue, RiskIssueError> {
            let mut locked_self = self.lock().expect("mock risk issue service mutex poisoned");
            locked_self.risk_issue_by_id_result.save_arguments(id);

            locked_self.risk_issue_by_id_result.return_value_result()
        }

        async fn create_risk_issue(
            &self,
            risk_issue: &NewRiskIssue,
            _ext_cxn: &mut impl ExternalConnectivity,
            _p_detect: &impl DetectProject,
            _u_detect: &impl DetectUser,
            _ri_write: &impl driven_ports::RiskIssueWriter,
            _ri_read: &impl driven_ports::RiskIssueReader,
        ) -> Result<RiskIssue, RiskIssueError> {
            let mut locked_self = self.lock().expect("mock risk issue service mutex poisoned");
            locked_self
                .create_risk_issue_result
                .save_arguments(risk_issue.clone());

            locked_self.create_risk_issue_result.return_value_result()
        }

        async fn update_risk_issue(
            &self,
            id: i32,
            update: &RiskIssueUpdate,
            _ext_cxn: &mut impl TransactableExternalConnectivity,
            _p_detect: &impl DetectProject,
            _u_detect: &impl DetectUser,
            _ri_read: &impl driven_ports::RiskIssueReader,
            _ri_write: &impl driven_ports::RiskIssueWriter,
        ) -> Result<RiskIssue, RiskIssueError> {
            let mut locked_self = self.lock().expect("mock risk issue service mutex poisoned");
            locked_self
                .update_risk_issue_result
                .save_arguments((id, update.clone()));

            locked_self.update_risk_issue_result.return_value_result()
        }

        async fn delete_risk_issue(
            &self,
            id: i32,
            _ext_cxn: &mut impl ExternalConnectivity,
            _ri_write: &impl driven_ports::RiskIssueWriter,
        ) -> Result<(), RiskIssueError> {
            let mut locked_self = self.lock().expect("mock risk issue service mutex poisoned");
            locked_self.delete_risk_issue_result.save_arguments(id);

            locked_self.delete_risk_issue_result.return_value_result()
        }
    }
}
