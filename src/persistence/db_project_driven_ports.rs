use super::{Count, NewId};
use crate::domain;
use crate::domain::project::{NewProject, Project, ProjectFilter, ProjectUpdate};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::Context;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder, query_as};

const PROJECT_COLUMNS: &str = "p.id, p.name, p.description, p.estimated_budget, \
    p.actual_expenditure, p.status, p.start_date, p.end_date, p.manager_id, p.created_at, \
    p.updated_at";

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: i32,
    name: String,
    description: Option<String>,
    estimated_budget: Option<BigDecimal>,
    actual_expenditure: Option<BigDecimal>,
    status: String,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    manager_id: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = anyhow::Error;

    fn try_from(value: ProjectRow) -> Result<Self, Self::Error> {
        Ok(Project {
            id: value.id,
            name: value.name,
            description: value.description,
            estimated_budget: value.estimated_budget,
            actual_expenditure: value.actual_expenditure,
            status: value
                .status
                .parse()
                .with_context(|| format!("Reading status of project {}", value.id))?,
            start_date: value.start_date,
            end_date: value.end_date,
            manager_id: value.manager_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

pub struct DbReadProjects {}

impl domain::project::driven_ports::ProjectReader for DbReadProjects {
    async fn all(
        &self,
        filter: &ProjectFilter,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<Project>, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT ");
        query.push(PROJECT_COLUMNS);
        query.push(" FROM projects p WHERE TRUE");
        if let Some(status) = filter.status {
            query.push(" AND p.status = ").push_bind(status.to_string());
        }
        if let Some(manager_id) = filter.manager_id {
            query.push(" AND p.manager_id = ").push_bind(manager_id);
        }
        query.push(" ORDER BY p.id");

        query
            .build_query_as::<ProjectRow>()
            .fetch_all(connection.borrow_connection())
            .await
            .context("Fetching projects")?
            .into_iter()
            .map(Project::try_from)
            .collect()
    }

    async fn by_id(
        &self,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<Project>, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let project = query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(connection.borrow_connection())
        .await
        .context("Fetching a project by id")?;

        project.map(Project::try_from).transpose()
    }
}

pub struct DbWriteProjects {}

impl domain::project::driven_ports::ProjectWriter for DbWriteProjects {
    async fn create_project(
        &self,
        project: &NewProject,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<i32, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let new_project = query_as::<_, NewId>(
            "INSERT INTO projects(name, description, estimated_budget, actual_expenditure, status, start_date, end_date, manager_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING projects.id",
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(&project.estimated_budget)
        .bind(&project.actual_expenditure)
        .bind(project.status.to_string())
        .bind(project.start_date)
        .bind(project.end_date)
        .bind(project.manager_id)
        .fetch_one(connection.borrow_connection())
        .await
        .context("Inserting new project")?;

        Ok(new_project.id)
    }

    async fn update_project(
        &self,
        id: i32,
        update: &ProjectUpdate,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let mut query = QueryBuilder::<Postgres>::new("UPDATE projects SET updated_at = now()");
        if let Some(name) = &update.name {
            query.push(", name = ").push_bind(name.clone());
        }
        if let Some(description) = &update.description {
            query.push(", description = ").push_bind(description.clone());
        }
        if let Some(estimated_budget) = &update.estimated_budget {
            query
                .push(", estimated_budget = ")
                .push_bind(estimated_budget.clone());
        }
        if let Some(actual_expenditure) = &update.actual_expenditure {
            query
                .push(", actual_expenditure = ")
                .push_bind(actual_expenditure.clone());
        }
        if let Some(status) = update.status {
            query.push(", status = ").push_bind(status.to_string());
        }
        if let Some(start_date) = update.start_date {
            query.push(", start_date = ").push_bind(start_date);
        }
        if let Some(end_date) = update.end_date {
            query.push(", end_date = ").push_bind(end_date);
        }
        if let Some(manager_id) = update.manager_id {
            query.push(", manager_id = ").push_bind(manager_id);
        }
        query.push(" WHERE id = ").push_bind(id);

        query
            .build()
            .execute(connection.borrow_connection())
            .await
            .context("Updating a project")?;

        Ok(())
    }

    async fn delete_project(
        &self,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(connection.borrow_connection())
            .await
            .context("Deleting a project")?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct DbDetectProject {}

impl domain::project::driven_ports::DetectProject for DbDetectProject {
    async fn project_exists(
        &self,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let project_count =
            query_as::<_, Count>("SELECT count(*) AS count FROM projects p WHERE p.id = $1")
                .bind(id)
                .fetch_one(connection.borrow_connection())
                .await
                .context("Detecting project with ID")?;

        Ok(project_count.count() > 0)
    }
}
