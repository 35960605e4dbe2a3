use crate::domain;
use crate::domain::project::driving_ports::ProjectError;
use crate::domain::user::{UserExistsErr, driven_ports::DetectUser};
use crate::domain::UnrecognizedValue;
use crate::external_connections::{
    ExternalConnectivity, TransactableExternalConnectivity, TransactionHandle,
};
use anyhow::Context;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Months, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// Lifecycle state of a project. Any state may move to any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    #[display("pending")]
    Pending,
    #[display("in_progress")]
    InProgress,
    #[display("completed")]
    Completed,
    #[display("on_hold")]
    OnHold,
    #[display("cancelled")]
    Cancelled,
}

impl FromStr for ProjectStatus {
    type Err = UnrecognizedValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "on_hold" => Ok(Self::OnHold),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(UnrecognizedValue(value.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub estimated_budget: Option<BigDecimal>,
    pub actual_expenditure: Option<BigDecimal>,
    pub status: ProjectStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub manager_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub estimated_budget: Option<BigDecimal>,
    pub actual_expenditure: Option<BigDecimal>,
    pub status: ProjectStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub manager_id: Option<i32>,
}

/// A partial update to a project. Outer [None] means "leave unchanged", while `Some(None)`
/// on a nullable field clears it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub estimated_budget: Option<Option<BigDecimal>>,
    pub actual_expenditure: Option<Option<BigDecimal>>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub manager_id: Option<Option<i32>>,
}

impl ProjectUpdate {
    /// Narrows the update down to the fields whose requested value differs from [current]
    pub fn changes_from(&self, current: &Project) -> ProjectUpdate {
        ProjectUpdate {
            name: domain::changed(&self.name, &current.name),
            description: domain::changed(&self.description, &current.description),
            estimated_budget: domain::changed(&self.estimated_budget, &current.estimated_budget),
            actual_expenditure: domain::changed(
                &self.actual_expenditure,
                &current.actual_expenditure,
            ),
            status: domain::changed(&self.status, &current.status),
            start_date: domain::changed(&self.start_date, &current.start_date),
            end_date: domain::changed(&self.end_date, &current.end_date),
            manager_id: domain::changed(&self.manager_id, &current.manager_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == ProjectUpdate::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub manager_id: Option<i32>,
}

/// Planned versus actual spend for a single project
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetSummary {
    pub project_id: i32,
    pub estimated_budget: BigDecimal,
    pub actual_expenditure: BigDecimal,
    /// Money left over (negative when over budget)
    pub variance: BigDecimal,
    /// How far actual spend is above (positive) or below (negative) the estimate, in percent
    /// rounded to two decimals
    pub variance_percentage: f64,
}

impl From<&Project> for BudgetSummary {
    fn from(project: &Project) -> Self {
        let estimated = project.estimated_budget.clone().unwrap_or_default();
        let actual = project.actual_expenditure.clone().unwrap_or_default();
        let variance = &estimated - &actual;
        let variance_percentage = domain::percentage(&(&actual - &estimated), &estimated, 2);

        BudgetSummary {
            project_id: project.id,
            estimated_budget: estimated,
            actual_expenditure: actual,
            variance,
            variance_percentage,
        }
    }
}

/// The projects inserted when sample data is requested on an empty database
pub fn sample_projects(now: DateTime<Utc>) -> Vec<NewProject> {
    let sample = |name: &str, description: &str, budget: i64, months: u32| NewProject {
        name: name.to_owned(),
        description: Some(description.to_owned()),
        estimated_budget: Some(BigDecimal::from(budget)),
        actual_expenditure: Some(BigDecimal::from(0)),
        status: ProjectStatus::Pending,
        start_date: Some(now),
        end_date: Some(
            now.checked_add_months(Months::new(months))
                .unwrap_or(now + Duration::days(30 * i64::from(months))),
        ),
        manager_id: None,
    };

    vec![
        sample(
            "Web Redesign",
            "Complete redesign of the company website with modern UI/UX principles",
            15_000,
            3,
        ),
        sample(
            "Mobile App Development",
            "Development of a new mobile application for both iOS and Android platforms",
            25_000,
            6,
        ),
        sample(
            "Database Migration",
            "Migration of legacy database systems to a new cloud-based solution",
            10_000,
            2,
        ),
    ]
}

pub mod driven_ports {
    use super::*;

    pub trait ProjectReader {
        async fn all(
            &self,
            filter: &ProjectFilter,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<Project>, anyhow::Error>;
        async fn by_id(
            &self,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<Project>, anyhow::Error>;
    }

    pub trait ProjectWriter {
        async fn create_project(
            &self,
            project: &NewProject,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<i32, anyhow::Error>;

        async fn update_project(
            &self,
            id: i32,
            update: &ProjectUpdate,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;

        /// Removes the project and its tasks, returning false if there was nothing to remove
        async fn delete_project(
            &self,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
    }

    pub trait DetectProject {
        async fn project_exists(
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
    pub enum ProjectError {
        #[error("project input was invalid: {0}")]
        Invalid(ValidationErrors),
        #[error("the requested project does not exist")]
        NotFound,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    impl From<UserExistsErr> for ProjectError {
        fn from(value: UserExistsErr) -> Self {
            match value {
                UserExistsErr::UserDoesNotExist(_) => ProjectError::Invalid(domain::field_error(
                    "manager_id",
                    "exists",
                    "The selected manager id is invalid.",
                )),
                UserExistsErr::PortError(err) => {
                    ProjectError::PortError(err.context("verifying project manager"))
                }
            }
        }
    }

    pub trait ProjectPort {
        async fn list_projects(
            &self,
            filter: &ProjectFilter,
            ext_cxn: &mut impl ExternalConnectivity,
            p_read: &impl driven_ports::ProjectReader,
        ) -> Result<Vec<Project>, ProjectError>;
        async fn project_by_id(
            &self,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            p_read: &impl driven_ports::ProjectReader,
        ) -> Result<Project, ProjectError>;
        async fn create_project(
            &self,
            project: &NewProject,
            ext_cxn: &mut impl ExternalConnectivity,
            u_detect: &impl DetectUser,
            p_write: &impl driven_ports::ProjectWriter,
            p_read: &impl driven_ports::ProjectReader,
        ) -> Result<Project, ProjectError>;
        async fn update_project(
            &self,
            id: i32,
            update: &ProjectUpdate,
            ext_cxn: &mut impl TransactableExternalConnectivity,
            u_detect: &impl DetectUser,
            p_read: &impl driven_ports::ProjectReader,
            p_write: &impl driven_ports::ProjectWriter,
        ) -> Result<Project, ProjectError>;
        async fn delete_project(
            &self,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            p_write: &impl driven_ports::ProjectWriter,
        ) -> Result<(), ProjectError>;
        async fn project_budget(
            &self,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            p_read: &impl driven_ports::ProjectReader,
        ) -> Result<BudgetSummary, ProjectError>;
    }
}

pub struct ProjectService {}

impl ProjectService {
    /// Inserts the [sample_projects] when no projects exist yet. Returns how many were inserted.
    pub async fn seed_sample_projects(
        &self,
        now: DateTime<Utc>,
        ext_cxn: &mut impl ExternalConnectivity,
        p_read: &impl driven_ports::ProjectReader,
        p_write: &impl driven_ports::ProjectWriter,
    ) -> Result<usize, anyhow::Error> {
        let existing = p_read
            .all(&ProjectFilter::default(), &mut *ext_cxn)
            .await
            .context("checking for existing projects before seeding")?;
        if !existing.is_empty() {
            return Ok(0);
        }

        let samples = sample_projects(now);
        for sample in &samples {
            p_write
                .create_project(sample, &mut *ext_cxn)
                .await
                .with_context(|| format!("seeding sample project {}", sample.name))?;
        }

        Ok(samples.len())
    }
}

impl driving_ports::ProjectPort for ProjectService {
    async fn list_projects(
        &self,
        filter: &ProjectFilter,
        ext_cxn: &mut impl ExternalConnectivity,
        p_read: &impl driven_ports::ProjectReader,
    ) -> Result<Vec<Project>, ProjectError> {
        let projects = p_read
            .all(filter, ext_cxn)
            .await
            .context("listing projects")?;

        Ok(projects)
    }

    async fn project_by_id(
        &self,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        p_read: &impl driven_ports::ProjectReader,
    ) -> Result<Project, ProjectError> {
        p_read
            .by_id(id, ext_cxn)
            .await
            .context("fetching a project by id")?
            .ok_or(ProjectError::NotFound)
    }

    async fn create_project(
        &self,
        project: &NewProject,
        ext_cxn: &mut impl ExternalConnectivity,
        u_detect: &impl DetectUser,
        p_write: &impl driven_ports::ProjectWriter,
        p_read: &impl driven_ports::ProjectReader,
    ) -> Result<Project, ProjectError> {
        if let Some(manager_id) = project.manager_id {
            domain::user::verify_user_exists(manager_id, &mut *ext_cxn, u_detect).await?;
        }

        let new_id = p_write
            .create_project(project, &mut *ext_cxn)
            .await
            .context("creating a project")?;

        p_read
            .by_id(new_id, ext_cxn)
            .await
            .context("reading back a newly created project")?
            .ok_or_else(|| {
                ProjectError::PortError(anyhow::anyhow!("project {new_id} vanished after insert"))
            })
    }

    async fn update_project(
        &self,
        id: i32,
        update: &ProjectUpdate,
        ext_cxn: &mut impl TransactableExternalConnectivity,
        u_detect: &impl DetectUser,
        p_read: &impl driven_ports::ProjectReader,
        p_write: &impl driven_ports::ProjectWriter,
    ) -> Result<Project, ProjectError> {
        let mut txn = ext_cxn
            .start_transaction()
            .await
            .context("starting project update transaction")?;

        let current = p_read
            .by_id(id, &mut txn)
            .await
            .context("fetching project to update")?
            .ok_or(ProjectError::NotFound)?;

        if let Some(Some(manager_id)) = update.manager_id {
            domain::user::verify_user_exists(manager_id, &mut txn, u_detect).await?;
        }

        let changes = update.changes_from(&current);
        if changes.is_empty() {
            return Ok(current);
        }

        p_write
            .update_project(id, &changes, &mut txn)
            .await
            .context("updating a project")?;
        let updated = p_read
            .by_id(id, &mut txn)
            .await
            .context("reading back an updated project")?
            .ok_or(ProjectError::NotFound)?;
        txn.commit()
            .await
            .context("committing project update")?;

        Ok(updated)
    }

    async fn delete_project(
        &self,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        p_write: &impl driven_ports::ProjectWriter,
    ) -> Result<(), ProjectError> {
        let removed = p_write
            .delete_project(id, ext_cxn)
            .await
            .context("deleting a project")?;

        if removed {
            Ok(())
        } else {
            Err(ProjectError::NotFound)
        }
    }

    async fn project_budget(
        &self,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        p_read: &impl driven_ports::ProjectReader,
    ) -> Result<BudgetSummary, ProjectError> {
        let project = self.project_by_id(id, ext_cxn, p_read).await?;

        Ok(BudgetSummary::from(&project))
    }
}
