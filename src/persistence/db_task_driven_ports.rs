use super::{Count, NewId};
use crate::domain;
use crate::domain::project::Project;
use crate::domain::task::{
    NewTask, Task, TaskDetails, TaskFilter, TaskQuery, TaskSort, TaskSortField, TaskStatus,
    TaskUpdate,
};
use crate::domain::user::User;
use crate::domain::SortDirection;
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::Context;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

/// Selects a task joined with its project and, when it has one, its assignee
const TASK_DETAILS_SELECT: &str = "SELECT t.id, t.title, t.description, t.project_id, \
    t.assignee_id, t.due_date, t.priority, t.status, t.estimated_hours, t.created_at, t.updated_at, \
    p.name AS project_name, p.description AS project_description, \
    p.estimated_budget AS project_estimated_budget, \
    p.actual_expenditure AS project_actual_expenditure, \
    p.status AS project_status, p.start_date AS project_start_date, p.end_date AS project_end_date, \
    p.manager_id AS project_manager_id, p.created_at AS project_created_at, \
    p.updated_at AS project_updated_at, \
    u.name AS assignee_name, u.email AS assignee_email, \
    u.created_at AS assignee_created_at, u.updated_at AS assignee_updated_at \
    FROM tasks t \
    JOIN projects p ON p.id = t.project_id \
    LEFT JOIN users u ON u.id = t.assignee_id";

#[derive(sqlx::FromRow)]
struct TaskDetailsRow {
    id: i32,
    title: String,
    description: Option<String>,
    project_id: i32,
    assignee_id: Option<i32>,
    due_date: Option<DateTime<Utc>>,
    priority: String,
    status: String,
    estimated_hours: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    project_name: String,
    project_description: Option<String>,
    project_estimated_budget: Option<BigDecimal>,
    project_actual_expenditure: Option<BigDecimal>,
    project_status: String,
    project_start_date: Option<DateTime<Utc>>,
    project_end_date: Option<DateTime<Utc>>,
    project_manager_id: Option<i32>,
    project_created_at: DateTime<Utc>,
    project_updated_at: DateTime<Utc>,
    assignee_name: Option<String>,
    assignee_email: Option<String>,
    assignee_created_at: Option<DateTime<Utc>>,
    assignee_updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<TaskDetailsRow> for TaskDetails {
    type Error = anyhow::Error;

    fn try_from(value: TaskDetailsRow) -> Result<Self, Self::Error> {
        let assignee = match (
            value.assignee_id,
            value.assignee_name,
            value.assignee_email,
            value.assignee_created_at,
            value.assignee_updated_at,
        ) {
            (Some(id), Some(name), Some(email), Some(created_at), Some(updated_at)) => Some(User {
                id,
                name,
                email,
                created_at,
                updated_at,
            }),
            _ => None,
        };

        let project = Project {
            id: value.project_id,
            name: value.project_name,
            description: value.project_description,
            estimated_budget: value.project_estimated_budget,
            actual_expenditure: value.project_actual_expenditure,
            status: value
                .project_status
                .parse()
                .with_context(|| format!("Reading status of project {}", value.project_id))?,
            start_date: value.project_start_date,
            end_date: value.project_end_date,
            manager_id: value.project_manager_id,
            created_at: value.project_created_at,
            updated_at: value.project_updated_at,
        };

        let task = Task {
            id: value.id,
            title: value.title,
            description: value.description,
            project_id: value.project_id,
            assignee_id: value.assignee_id,
            due_date: value.due_date,
            priority: value
                .priority
                .parse()
                .with_context(|| format!("Reading priority of task {}", value.id))?,
            status: value
                .status
                .parse()
                .with_context(|| format!("Reading status of task {}", value.id))?,
            estimated_hours: value.estimated_hours,
            created_at: value.created_at,
            updated_at: value.updated_at,
        };

        Ok(TaskDetails {
            task,
            project,
            assignee,
        })
    }
}

/// SQL expression a task listing is ordered by. Enumerations sort in declaration order
/// rather than alphabetically.
fn order_expression(field: TaskSortField) -> &'static str {
    match field {
        TaskSortField::Id => "t.id",
        TaskSortField::Title => "t.title",
        TaskSortField::DueDate => "t.due_date",
        TaskSortField::Priority => {
            "CASE t.priority WHEN 'low' THEN 0 WHEN 'medium' THEN 1 WHEN 'high' THEN 2 END"
        }
        TaskSortField::Status => {
            "CASE t.status WHEN 'pending' THEN 0 WHEN 'in_progress' THEN 1 \
             WHEN 'completed' THEN 2 WHEN 'on_hold' THEN 3 END"
        }
        TaskSortField::EstimatedHours => "t.estimated_hours",
        TaskSortField::CreatedAt => "t.created_at",
        TaskSortField::UpdatedAt => "t.updated_at",
    }
}

fn order_by_clause(sort: TaskSort) -> String {
    let direction = match sort.direction {
        SortDirection::Ascending => "ASC",
        SortDirection::Descending => "DESC",
    };

    format!(
        " ORDER BY {} {direction} NULLS LAST, t.id ASC",
        order_expression(sort.field)
    )
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &TaskFilter) {
    query.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        query.push(" AND t.status = ").push_bind(status.to_string());
    }
    if let Some(priority) = filter.priority {
        query.push(" AND t.priority = ").push_bind(priority.to_string());
    }
    if let Some(project_id) = filter.project_id {
        query.push(" AND t.project_id = ").push_bind(project_id);
    }
    if let Some(assignee_id) = filter.assignee_id {
        query.push(" AND t.assignee_id = ").push_bind(assignee_id);
    }
}

pub struct DbTaskReader {}

impl domain::task::driven_ports::TaskReader for DbTaskReader {
    async fn all(
        &self,
        query: &TaskQuery,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<TaskDetails>, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let mut statement = QueryBuilder::<Postgres>::new(TASK_DETAILS_SELECT);
        push_filter(&mut statement, &query.filter);
        statement.push(order_by_clause(query.sort));

        statement
            .build_query_as::<TaskDetailsRow>()
            .fetch_all(connection.borrow_connection())
            .await
            .context("Fetching tasks")?
            .into_iter()
            .map(TaskDetails::try_from)
            .collect()
    }

    async fn by_id(
        &self,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<TaskDetails>, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let mut statement = QueryBuilder::<Postgres>::new(TASK_DETAILS_SELECT);
        statement.push(" WHERE t.id = ").push_bind(id);

        statement
            .build_query_as::<TaskDetailsRow>()
            .fetch_optional(connection.borrow_connection())
            .await
            .context("Fetching a task by id")?
            .map(TaskDetails::try_from)
            .transpose()
    }

    async fn upcoming(
        &self,
        from: DateTime<Utc>,
        limit: i64,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<TaskDetails>, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let mut statement = QueryBuilder::<Postgres>::new(TASK_DETAILS_SELECT);
        statement
            .push(" WHERE t.status <> ")
            .push_bind(TaskStatus::Completed.to_string())
            .push(" AND t.due_date >= ")
            .push_bind(from)
            .push(" ORDER BY t.due_date ASC, t.id ASC LIMIT ")
            .push_bind(limit);

        statement
            .build_query_as::<TaskDetailsRow>()
            .fetch_all(connection.borrow_connection())
            .await
            .context("Fetching upcoming tasks")?
            .into_iter()
            .map(TaskDetails::try_from)
            .collect()
    }
}

pub struct DbTaskWriter {}

impl domain::task::driven_ports::TaskWriter for DbTaskWriter {
    async fn create_task(
        &self,
        task: &NewTask,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<i32, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let new_task = sqlx::query_as::<_, NewId>(
            "INSERT INTO tasks(title, description, project_id, assignee_id, due_date, priority, status, estimated_hours) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING tasks.id",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.project_id)
        .bind(task.assignee_id)
        .bind(task.due_date)
        .bind(task.priority.to_string())
        .bind(task.status.to_string())
        .bind(task.estimated_hours)
        .fetch_one(connection.borrow_connection())
        .await
        .context("Inserting new task")?;

        Ok(new_task.id)
    }

    async fn update_task(
        &self,
        id: i32,
        update: &TaskUpdate,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let mut statement = QueryBuilder::<Postgres>::new("UPDATE tasks SET updated_at = now()");
        if let Some(title) = &update.title {
            statement.push(", title = ").push_bind(title.clone());
        }
        if let Some(description) = &update.description {
            statement.push(", description = ").push_bind(description.clone());
        }
        if let Some(project_id) = update.project_id {
            statement.push(", project_id = ").push_bind(project_id);
        }
        if let Some(assignee_id) = update.assignee_id {
            statement.push(", assignee_id = ").push_bind(assignee_id);
        }
        if let Some(due_date) = update.due_date {
            statement.push(", due_date = ").push_bind(due_date);
        }
        if let Some(priority) = update.priority {
            statement.push(", priority = ").push_bind(priority.to_string());
        }
        if let Some(status) = update.status {
            statement.push(", status = ").push_bind(status.to_string());
        }
        if let Some(estimated_hours) = update.estimated_hours {
            statement.push(", estimated_hours = ").push_bind(estimated_hours);
        }
        statement.push(" WHERE id = ").push_bind(id);

        statement
            .build()
            .execute(connection.borrow_connection())
            .await
            .context("Updating a task")?;

        Ok(())
    }

    async fn delete_task(
        &self,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(connection.borrow_connection())
            .await
            .context("Deleting a task")?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct DbDetectTask {}

impl domain::task::driven_ports::DetectTask for DbDetectTask {
    async fn task_exists(
        &self,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let task_count = sqlx::query_as::<_, Count>("SELECT count(*) AS count FROM tasks t WHERE t.id = $1")
            .bind(id)
            .fetch_one(connection.borrow_connection())
            .await
            .context("Detecting task with ID")?;

        Ok(task_count.count() > 0)
    }
}
