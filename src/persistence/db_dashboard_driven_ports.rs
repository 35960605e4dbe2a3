use crate::domain;
use crate::domain::dashboard::DashboardTotals;
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::Context;
use bigdecimal::BigDecimal;

#[derive(sqlx::FromRow)]
struct TotalsRow {
    total_projects: i64,
    active_projects: i64,
    total_tasks: i64,
    completed_tasks: i64,
    total_team_members: i64,
    total_estimated_budget: BigDecimal,
    total_actual_expenditure: BigDecimal,
}

pub struct DbDashboardReader {}

impl domain::dashboard::driven_ports::DashboardReader for DbDashboardReader {
    async fn totals(
        &self,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<DashboardTotals, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let totals = sqlx::query_as::<_, TotalsRow>(
            "SELECT \
                (SELECT count(*) FROM projects) AS total_projects, \
                (SELECT count(*) FROM projects WHERE status = 'in_progress') AS active_projects, \
                (SELECT count(*) FROM tasks) AS total_tasks, \
                (SELECT count(*) FROM tasks WHERE status = 'completed') AS completed_tasks, \
                (SELECT count(*) FROM users) AS total_team_members, \
                (SELECT COALESCE(sum(estimated_budget), 0) FROM projects) AS total_estimated_budget, \
                (SELECT COALESCE(sum(actual_expenditure), 0) FROM projects) AS total_actual_expenditure",
        )
        .fetch_one(connection.borrow_connection())
        .await
        .context("Gathering dashboard totals")?;

        Ok(DashboardTotals {
            total_projects: totals.total_projects,
            active_projects: totals.active_projects,
            total_tasks: totals.total_tasks,
            completed_tasks: totals.completed_tasks,
            total_team_members: totals.total_team_members,
            total_estimated_budget: totals.total_estimated_budget,
            total_actual_expenditure: totals.total_actual_expenditure,
        })
    }
}
