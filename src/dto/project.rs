use crate::domain;
use crate::domain::project::ProjectStatus;
use crate::dto::{FieldConversion, double_option, empty_as_none};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationErrors};

/// DTO for a project returned by the API. Money amounts are decimal strings with two places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Project {
    #[schema(example = 3)]
    pub id: i32,
    #[schema(example = "Web Redesign")]
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, example = "15000.00")]
    pub estimated_budget: Option<BigDecimal>,
    #[schema(value_type = Option<String>, example = "2500.50")]
    pub actual_expenditure: Option<BigDecimal>,
    pub status: ProjectStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub manager_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<domain::project::Project> for Project {
    fn from(value: domain::project::Project) -> Self {
        Project {
            id: value.id,
            name: value.name,
            description: value.description,
            estimated_budget: value.estimated_budget,
            actual_expenditure: value.actual_expenditure,
            status: value.status,
            start_date: value.start_date,
            end_date: value.end_date,
            manager_id: value.manager_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// DTO for creating a new project via the API. Money amounts may be sent as numbers or
/// decimal strings, and must lie between 0 and 9999999999.99.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewProject {
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "Web Redesign")]
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<f64>, example = 15000.0)]
    pub estimated_budget: Option<BigDecimal>,
    #[schema(value_type = Option<f64>)]
    pub actual_expenditure: Option<BigDecimal>,
    /// Defaults to "pending"
    #[schema(example = "pending")]
    pub status: Option<String>,
    #[schema(example = "2024-03-01")]
    pub start_date: Option<String>,
    #[schema(example = "2024-06-01")]
    pub end_date: Option<String>,
    pub manager_id: Option<i32>,
}

impl TryFrom<NewProject> for domain::project::NewProject {
    type Error = ValidationErrors;

    fn try_from(value: NewProject) -> Result<Self, Self::Error> {
        let mut conversion = FieldConversion::new(value.validate());
        let name = conversion.required("name", value.name);
        let estimated_budget = conversion.money("estimated_budget", value.estimated_budget);
        let actual_expenditure = conversion.money("actual_expenditure", value.actual_expenditure);
        let status = conversion.choice("status", value.status.as_deref());
        let start_date = conversion.timestamp("start_date", value.start_date.as_deref());
        let end_date = conversion.timestamp("end_date", value.end_date.as_deref());

        let Some(name) = name else {
            return Err(conversion.into_errors());
        };
        conversion.finish()?;

        Ok(domain::project::NewProject {
            name,
            description: value.description,
            estimated_budget,
            actual_expenditure,
            status: status.unwrap_or_default(),
            start_date,
            end_date,
            manager_id: value.manager_id,
        })
    }
}

/// DTO for partially updating a project. Fields left out are unchanged, and nullable
/// fields can be cleared by sending null. `name` and `status` can't be null.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProject {
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255))]
    #[schema(value_type = Option<String>)]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<f64>)]
    pub estimated_budget: Option<Option<BigDecimal>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<f64>)]
    pub actual_expenditure: Option<Option<BigDecimal>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "in_progress")]
    pub status: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub start_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub end_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i32>)]
    pub manager_id: Option<Option<i32>>,
}

impl TryFrom<UpdateProject> for domain::project::ProjectUpdate {
    type Error = ValidationErrors;

    fn try_from(value: UpdateProject) -> Result<Self, Self::Error> {
        let mut conversion = FieldConversion::new(value.validate());
        let name = conversion.present("name", value.name);
        let estimated_budget =
            conversion.nullable_money("estimated_budget", value.estimated_budget);
        let actual_expenditure =
            conversion.nullable_money("actual_expenditure", value.actual_expenditure);
        let status = conversion.present("status", value.status);
        let status = conversion.choice("status", status.as_deref());
        let start_date = conversion.nullable_timestamp(
            "start_date",
            value.start_date.as_ref().map(Option::as_deref),
        );
        let end_date =
            conversion.nullable_timestamp("end_date", value.end_date.as_ref().map(Option::as_deref));
        conversion.finish()?;

        Ok(domain::project::ProjectUpdate {
            name,
            description: value.description,
            estimated_budget,
            actual_expenditure,
            status,
            start_date,
            end_date,
            manager_id: value.manager_id,
        })
    }
}

/// Optional equality filters for the project listing
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProjectListQuery {
    /// Only include projects with this status
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Only include projects managed by this user
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
}

impl TryFrom<ProjectListQuery> for domain::project::ProjectFilter {
    type Error = ValidationErrors;

    fn try_from(value: ProjectListQuery) -> Result<Self, Self::Error> {
        let mut conversion = FieldConversion::new(Ok(()));
        let status = conversion.choice("status", value.status.as_deref());
        let manager_id = conversion.identifier("manager", value.manager.as_deref());
        conversion.finish()?;

        Ok(domain::project::ProjectFilter { status, manager_id })
    }
}

/// DTO summarizing how a project's spend compares to its estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BudgetSummary {
    #[schema(example = 3)]
    pub project_id: i32,
    #[schema(value_type = String, example = "15000.00")]
    pub estimated_budget: BigDecimal,
    #[schema(value_type = String, example = "16500.00")]
    pub actual_expenditure: BigDecimal,
    /// Estimated minus actual. Negative when the project is over budget.
    #[schema(value_type = String, example = "-1500.00")]
    pub variance: BigDecimal,
    /// How far actual spend is above (positive) or below (negative) the estimate, in percent
    #[schema(example = 10.0)]
    pub variance_percentage: f64,
}

impl From<domain::project::BudgetSummary> for BudgetSummary {
    fn from(value: domain::project::BudgetSummary) -> Self {
        BudgetSummary {
            project_id: value.project_id,
            estimated_budget: value.estimated_budget,
            actual_expenditure: value.actual_expenditure,
            variance: value.variance,
            variance_percentage: value.variance_percentage,
        }
    }
}
