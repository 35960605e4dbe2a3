use crate::domain;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// DTO with headline numbers about every project, task and team member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    #[schema(example = 12)]
    pub total_projects: i64,
    /// Projects which are in progress
    #[schema(example = 5)]
    pub active_projects: i64,
    #[schema(example = 140)]
    pub total_tasks: i64,
    #[schema(example = 97)]
    pub completed_tasks: i64,
    #[schema(example = 8)]
    pub total_team_members: i64,
    /// Percent of the combined estimated budget spent so far
    #[schema(example = 42.5)]
    pub budget_utilization: f64,
}

impl From<domain::dashboard::DashboardStats> for DashboardStats {
    fn from(value: domain::dashboard::DashboardStats) -> Self {
        DashboardStats {
            total_projects: value.total_projects,
            active_projects: value.active_projects,
            total_tasks: value.total_tasks,
            completed_tasks: value.completed_tasks,
            total_team_members: value.total_team_members,
            budget_utilization: value.budget_utilization,
        }
    }
}
