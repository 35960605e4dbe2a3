use crate::domain;
use crate::domain::project::driven_ports::DetectProject;
use crate::domain::project::Project;
use crate::domain::task::driving_ports::TaskError;
use crate::domain::user::{User, UserExistsErr, driven_ports::DetectUser};
use crate::domain::{SortDirection, UnrecognizedValue};
use crate::external_connections::{
    ExternalConnectivity, TransactableExternalConnectivity, TransactionHandle,
};
use anyhow::Context;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// Urgency of a task. Variants are declared from least to most urgent, which is also
/// the order tasks are sorted in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Display, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    #[display("low")]
    Low,
    #[default]
    #[display("medium")]
    Medium,
    #[display("high")]
    High,
}

impl FromStr for TaskPriority {
    type Err = UnrecognizedValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(UnrecognizedValue(value.to_owned())),
        }
    }
}

/// Progress of a task. There's no transition graph, so any status may follow any other.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Display, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    #[display("pending")]
    Pending,
    #[display("in_progress")]
    InProgress,
    #[display("completed")]
    Completed,
    #[display("on_hold")]
    OnHold,
}

impl FromStr for TaskStatus {
    type Err = UnrecognizedValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "on_hold" => Ok(Self::OnHold),
            _ => Err(UnrecognizedValue(value.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub project_id: i32,
    pub assignee_id: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub estimated_hours: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task along with the records it references
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDetails {
    pub task: Task,
    pub project: Project,
    pub assignee: Option<User>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub project_id: i32,
    pub assignee_id: i32,
    pub due_date: DateTime<Utc>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub estimated_hours: Option<f64>,
}

/// A partial update to a task. Only `description` and `estimated_hours` can be cleared.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub project_id: Option<i32>,
    pub assignee_id: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub estimated_hours: Option<Option<f64>>,
}

impl TaskUpdate {
    /// Narrows the update down to the fields whose requested value differs from [current]
    pub fn changes_from(&self, current: &Task) -> TaskUpdate {
        TaskUpdate {
            title: domain::changed(&self.title, &current.title),
            description: domain::changed(&self.description, &current.description),
            project_id: domain::changed(&self.project_id, &current.project_id),
            assignee_id: domain::changed(&self.assignee_id.map(Some), &current.assignee_id)
                .flatten(),
            due_date: domain::changed(&self.due_date.map(Some), &current.due_date).flatten(),
            priority: domain::changed(&self.priority, &current.priority),
            status: domain::changed(&self.status, &current.status),
            estimated_hours: domain::changed(&self.estimated_hours, &current.estimated_hours),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == TaskUpdate::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub project_id: Option<i32>,
    pub assignee_id: Option<i32>,
}

/// Fields a task listing can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskSortField {
    Id,
    Title,
    #[default]
    DueDate,
    Priority,
    Status,
    EstimatedHours,
    CreatedAt,
    UpdatedAt,
}

impl FromStr for TaskSortField {
    type Err = UnrecognizedValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "id" => Ok(Self::Id),
            "title" => Ok(Self::Title),
            "due_date" => Ok(Self::DueDate),
            "priority" => Ok(Self::Priority),
            "status" => Ok(Self::Status),
            "estimated_hours" => Ok(Self::EstimatedHours),
            "created_at" => Ok(Self::CreatedAt),
            "updated_at" => Ok(Self::UpdatedAt),
            _ => Err(UnrecognizedValue(value.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskSort {
    pub field: TaskSortField,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskQuery {
    pub filter: TaskFilter,
    pub sort: TaskSort,
}

pub mod driven_ports {
    use super::*;

    pub trait TaskReader {
        /// Lists matching tasks. Rows with a null sort value come last whichever
        /// direction is requested, and ties are broken by ascending id.
        async fn all(
            &self,
            query: &TaskQuery,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<TaskDetails>, anyhow::Error>;
        async fn by_id(
            &self,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<TaskDetails>, anyhow::Error>;
        /// Tasks that aren't completed and are due at or after [from], soonest first
        async fn upcoming(
            &self,
            from: DateTime<Utc>,
            limit: i64,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<TaskDetails>, anyhow::Error>;
    }

    pub trait TaskWriter {
        async fn create_task(
            &self,
            task: &NewTask,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<i32, anyhow::Error>;
        async fn update_task(
            &self,
            id: i32,
            update: &TaskUpdate,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;
        /// Removes the task, returning false if there was nothing to remove
        async fn delete_task(
            &self,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
    }

    pub trait DetectTask {
        async fn task_exists(
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
    pub enum TaskError {
        #[error("task input was invalid: {0}")]
        Invalid(ValidationErrors),
        #[error("the requested task does not exist")]
        NotFound,
        #[error("the task's project does not exist")]
        ProjectNotFound,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    impl From<UserExistsErr> for TaskError {
        fn from(value: UserExistsErr) -> Self {
            match value {
                UserExistsErr::UserDoesNotExist(_) => TaskError::Invalid(domain::field_error(
                    "assignee_id",
                    "exists",
                    "The selected assignee id is invalid.",
                )),
                UserExistsErr::PortError(err) => {
                    TaskError::PortError(err.context("verifying task assignee"))
                }
            }
        }
    }

    pub trait TaskPort {
        async fn list_tasks(
            &self,
            query: &TaskQuery,
            ext_cxn: &mut impl ExternalConnectivity,
            t_read: &impl driven_ports::TaskReader,
        ) -> Result<Vec<TaskDetails>, TaskError>;
        async fn task_by_id(
            &self,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            t_read: &impl driven_ports::TaskReader,
        ) -> Result<TaskDetails, TaskError>;
        async fn create_task(
            &self,
            task: &NewTask,
            ext_cxn: &mut impl ExternalConnectivity,
            p_detect: &impl DetectProject,
            u_detect: &impl DetectUser,
            t_write: &impl driven_ports::TaskWriter,
            t_read: &impl driven_ports::TaskReader,
        ) -> Result<TaskDetails, TaskError>;
        async fn update_task(
            &self,
            id: i32,
            update: &TaskUpdate,
            ext_cxn: &mut impl TransactableExternalConnectivity,
            p_detect: &impl DetectProject,
            u_detect: &impl DetectUser,
            t_read: &impl driven_ports::TaskReader,
            t_write: &impl driven_ports::TaskWriter,
        ) -> Result<TaskDetails, TaskError>;
        async fn delete_task(
            &self,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            t_write: &impl driven_ports::TaskWriter,
        ) -> Result<(), TaskError>;
        /// Lists the tasks of a single project, failing with [TaskError::ProjectNotFound]
        /// if the project doesn't exist
        async fn tasks_for_project(
            &self,
            project_id: i32,
            sort: TaskSort,
            ext_cxn: &mut impl ExternalConnectivity,
            p_detect: &impl DetectProject,
            t_read: &impl driven_ports::TaskReader,
        ) -> Result<Vec<TaskDetails>, TaskError>;
    }
}

async fn verify_project_reference(
    project_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    p_detect: &impl DetectProject,
) -> Result<(), TaskError> {
    let exists = p_detect
        .project_exists(project_id, ext_cxn)
        .await
        .context("verifying task project")?;

    if exists {
        Ok(())
    } else {
        Err(TaskError::Invalid(domain::field_error(
            "project_id",
            "exists",
            "The selected project id is invalid.",
        )))
    }
}

pub struct TaskService {}

impl driving_ports::TaskPort for TaskService {
    async fn list_tasks(
        &self,
        query: &TaskQuery,
        ext_cxn: &mut impl ExternalConnectivity,
        t_read: &impl driven_ports::TaskReader,
    ) -> Result<Vec<TaskDetails>, TaskError> {
        let tasks = t_read.all(query, ext_cxn).await.context("listing tasks")?;

        Ok(tasks)
    }

    async fn task_by_id(
        &self,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        t_read: &impl driven_ports::TaskReader,
    ) -> Result<TaskDetails, TaskError> {
        t_read
            .by_id(id, ext_cxn)
            .await
            .context("fetching a task by id")?
            .ok_or(TaskError::NotFound)
    }

    async fn create_task(
        &self,
        task: &NewTask,
        ext_cxn: &mut impl ExternalConnectivity,
        p_detect: &impl DetectProject,
        u_detect: &impl DetectUser,
        t_write: &impl driven_ports::TaskWriter,
        t_read: &impl driven_ports::TaskReader,
    ) -> Result<TaskDetails, TaskError> {
        verify_project_reference(task.project_id, &mut *ext_cxn, p_detect).await?;
        domain::user::verify_user_exists(task.assignee_id, &mut *ext_cxn, u_detect).await?;

        let new_id = t_write
            .create_task(task, &mut *ext_cxn)
            .await
            .context("creating a task")?;
        tracing::debug!(task_id = new_id, "Created task");

        t_read
            .by_id(new_id, ext_cxn)
            .await
            .context("reading back a newly created task")?
            .ok_or_else(|| TaskError::PortError(anyhow::anyhow!("task {new_id} vanished after insert")))
    }

    async fn update_task(
        &self,
        id: i32,
        update: &TaskUpdate,
        ext_cxn: &mut impl TransactableExternalConnectivity,
        p_detect: &impl DetectProject,
        u_detect: &impl DetectUser,
        t_read: &impl driven_ports::TaskReader,
        t_write: &impl driven_ports::TaskWriter,
    ) -> Result<TaskDetails, TaskError> {
        let mut txn = ext_cxn
            .start_transaction()
            .await
            .context("starting task update transaction")?;

        let current = t_read
            .by_id(id, &mut txn)
            .await
            .context("fetching task to update")?
            .ok_or(TaskError::NotFound)?;

        if let Some(project_id) = update.project_id {
            verify_project_reference(project_id, &mut txn, p_detect).await?;
        }
        if let Some(assignee_id) = update.assignee_id {
            domain::user::verify_user_exists(assignee_id, &mut txn, u_detect).await?;
        }

        let changes = update.changes_from(&current.task);
        if changes.is_empty() {
            tracing::debug!(task_id = id, "Task update made no changes");
            return Ok(current);
        }

        t_write
            .update_task(id, &changes, &mut txn)
            .await
            .context("updating a task")?;
        let updated = t_read
            .by_id(id, &mut txn)
            .await
            .context("reading back an updated task")?
            .ok_or(TaskError::NotFound)?;
        txn.commit().await.context("committing task update")?;

        Ok(updated)
    }

    async fn delete_task(
        &self,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        t_write: &impl driven_ports::TaskWriter,
    ) -> Result<(), TaskError> {
        let removed = t_write
            .delete_task(id, ext_cxn)
            .await
            .context("deleting a task")?;

        if removed {
            Ok(())
        } else {
            Err(TaskError::NotFound)
        }
    }

    async fn tasks_for_project(
        &self,
        project_id: i32,
        sort: TaskSort,
        ext_cxn: &mut impl ExternalConnectivity,
        p_detect: &impl DetectProject,
        t_read: &impl driven_ports::TaskReader,
    ) -> Result<Vec<TaskDetails>, TaskError> {
        let project_exists = p_detect
            .project_exists(project_id, &mut *ext_cxn)
            .await
            .context("checking project before listing its tasks")?;
        if !project_exists {
            return Err(TaskError::ProjectNotFound);
        }

        let query = TaskQuery {
            filter: TaskFilter {
                project_id: Some(project_id),
                ..Default::default()
            },
            sort,
        };
        let tasks = t_read
            .all(&query, ext_cxn)
            .await
            .context("listing tasks for a project")?;

        Ok(tasks)
    }
}
