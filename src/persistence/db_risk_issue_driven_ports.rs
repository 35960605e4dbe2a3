use super::NewId;
use crate::domain;
use crate::domain::risk_issue::{NewRiskIssue, RiskIssue, RiskIssueFilter, RiskIssueUpdate};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder, query_as};

const RISK_ISSUE_COLUMNS: &str = "ri.id, ri.project_id, ri.title, ri.description, ri.type, \
    ri.severity, ri.status, ri.due_date, ri.assigned_to, ri.created_at, ri.updated_at";

#[derive(sqlx::FromRow)]
struct RiskIssueRow {
    id: i32,
    project_id: i32,
    title: String,
    description: Option<String>,
    #[sqlx(rename = "type")]
    kind: String,
    severity: String,
    status: String,
    due_date: Option<DateTime<Utc>>,
    assigned_to: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RiskIssueRow> for RiskIssue {
    type Error = anyhow::Error;

    fn try_from(value: RiskIssueRow) -> Result<Self, Self::Error> {
        Ok(RiskIssue {
            id: value.id,
            project_id: value.project_id,
            title: value.title,
            description: value.description,
            kind: value
                .kind
                .parse()
                .with_context(|| format!("Reading type of risk or issue {}", value.id))?,
            severity: value
                .severity
                .parse()
                .with_context(|| format!("Reading severity of risk or issue {}", value.id))?,
            status: value
                .status
                .parse()
                .with_context(|| format!("Reading status of risk or issue {}", value.id))?,
            due_date: value.due_date,
            assigned_to: value.assigned_to,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

pub struct DbRiskIssueReader {}

impl domain::risk_issue::driven_ports::RiskIssueReader for DbRiskIssueReader {
    async fn all(
        &self,
        filter: &RiskIssueFilter,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<RiskIssue>, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let mut query = QueryBuilder::<Postgres>::new("SELECT ");
        query.push(RISK_ISSUE_COLUMNS);
        query.push(" FROM risks_issues ri WHERE TRUE");
        if let Some(project_id) = filter.project_id {
            query.push(" AND ri.project_id = ").push_bind(project_id);
        }
        if let Some(kind) = filter.kind {
            query.push(" AND ri.type = ").push_bind(kind.to_string());
        }
        if let Some(status) = filter.status {
            query.push(" AND ri.status = ").push_bind(status.to_string());
        }
        query.push(" ORDER BY ri.id");

        query
            .build_query_as::<RiskIssueRow>()
            .fetch_all(connection.borrow_connection())
            .await
            .context("Fetching risks and issues")?
            .into_iter()
            .map(RiskIssue::try_from)
            .collect()
    }

    async fn by_id(
        &self,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<RiskIssue>, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let risk_issue = query_as::<_, RiskIssueRow>(&format!(
            "SELECT {RISK_ISSUE_COLUMNS} FROM risks_issues ri WHERE ri.id = $1"
        ))
        .bind(id)
        .fetch_optional(connection.borrow_connection())
        .await
        .context("Fetching a risk or issue by id")?;

        risk_issue.map(RiskIssue::try_from).transpose()
    }
}

pub struct DbRiskIssueWriter {}

impl domain::risk_issue::driven_ports::RiskIssueWriter for DbRiskIssueWriter {
    async fn create_risk_issue(
        &self,
        risk_issue: &NewRiskIssue,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<i32, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let new_risk_issue = query_as::<_, NewId>(
            "INSERT INTO risks_issues(project_id, title, description, type, severity, status, due_date, assigned_to) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING risks_issues.id",
        )
        .bind(risk_issue.project_id)
        .bind(&risk_issue.title)
        .bind(&risk_issue.description)
        .bind(risk_issue.kind.to_string())
        .bind(risk_issue.severity.to_string())
        .bind(risk_issue.status.to_string())
        .bind(risk_issue.due_date)
        .bind(risk_issue.assigned_to)
        .fetch_one(connection.borrow_connection())
        .await
        .context("Inserting new risk or issue")?;

        Ok(new_risk_issue.id)
    }

    async fn update_risk_issue(
        &self,
        id: i32,
        update: &RiskIssueUpdate,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let mut query = QueryBuilder::<Postgres>::new("UPDATE risks_issues SET updated_at = now()");
        if let Some(project_id) = update.project_id {
            query.push(", project_id = ").push_bind(project_id);
        }
        if let Some(title) = &update.title {
            query.push(", title = ").push_bind(title.clone());
        }
        if let Some(description) = &update.description {
            query.push(", description = ").push_bind(description.clone());
        }
        if let Some(kind) = update.kind {
            query.push(", type = ").push_bind(kind.to_string());
        }
        if let Some(severity) = update.severity {
            query.push(", severity = ").push_bind(severity.to_string());
        }
        if let Some(status) = update.status {
            query.push(", status = ").push_bind(status.to_string());
        }
        if let Some(due_date) = update.due_date {
            query.push(", due_date = ").push_bind(due_date);
        }
        if let Some(assigned_to) = update.assigned_to {
            query.push(", assigned_to = ").push_bind(assigned_to);
        }
        query.push(" WHERE id = ").push_bind(id);

        query
            .build()
            .execute(connection.borrow_connection())
            .await
            .context("Updating a risk or issue")?;

        Ok(())
    }

    async fn delete_risk_issue(
        &self,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let result = sqlx::query("DELETE FROM risks_issues WHERE id = $1")
            .bind(id)
            .execute(connection.borrow_connection())
            .await
            .context("Deleting a risk or issue")?;

        Ok(result.rows_affected() > 0)
    }
}
