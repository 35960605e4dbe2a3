use crate::domain;
use crate::domain::dashboard::driving_ports::DashboardError;
use crate::domain::task::TaskDetails;
use crate::domain::task::driven_ports::TaskReader;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

/// Number of tasks shown in the upcoming tasks list
pub const UPCOMING_TASK_LIMIT: i64 = 5;

/// Raw counts and sums gathered from the store
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardTotals {
    pub total_projects: i64,
    pub active_projects: i64,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub total_team_members: i64,
    pub total_estimated_budget: BigDecimal,
    pub total_actual_expenditure: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub total_projects: i64,
    pub active_projects: i64,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub total_team_members: i64,
    /// Percentage of the estimated budget spent so far, rounded to one decimal
    pub budget_utilization: f64,
}

impl From<DashboardTotals> for DashboardStats {
    fn from(totals: DashboardTotals) -> Self {
        let budget_utilization = domain::percentage(
            &totals.total_actual_expenditure,
            &totals.total_estimated_budget,
            1,
        );

        DashboardStats {
            total_projects: totals.total_projects,
            active_projects: totals.active_projects,
            total_tasks: totals.total_tasks,
            completed_tasks: totals.completed_tasks,
            total_team_members: totals.total_team_members,
            budget_utilization,
        }
    }
}

pub mod driven_ports {
    use super::*;

    pub trait DashboardReader {
        async fn totals(
            &self,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<DashboardTotals, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum DashboardError {
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    pub trait DashboardPort {
        async fn stats(
            &self,
            ext_cxn: &mut impl ExternalConnectivity,
            d_read: &impl driven_ports::DashboardReader,
        ) -> Result<DashboardStats, DashboardError>;
        async fn upcoming_tasks(
            &self,
            now: DateTime<Utc>,
            ext_cxn: &mut impl ExternalConnectivity,
            t_read: &impl TaskReader,
        ) -> Result<Vec<TaskDetails>, DashboardError>;
    }
}

pub struct DashboardService {}

impl driving_ports::DashboardPort for DashboardService {
    async fn stats(
        &self,
        ext_cxn: &mut impl ExternalConnectivity,
        d_read: &impl driven_ports::DashboardReader,
    ) -> Result<DashboardStats, DashboardError> {
        let totals = d_read
            .totals(ext_cxn)
            .await
            .context("gathering dashboard totals")?;

        Ok(DashboardStats::from(totals))
    }

    async fn upcoming_tasks(
        &self,
        now: DateTime<Utc>,
        ext_cxn: &mut impl ExternalConnectivity,
        t_read: &impl TaskReader,
    ) -> Result<Vec<TaskDetails>, DashboardError> {
        let tasks = t_read
            .upcoming(now, UPCOMING_TASK_LIMIT, ext_cxn)
            .await
            .context("fetching upcoming tasks")?;

        Ok(tasks)
    }
}
