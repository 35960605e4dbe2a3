use crate::domain;
use crate::domain::risk_issue::{RiskIssueStatus, RiskIssueType, RiskSeverity};
use crate::dto::{FieldConversion, double_option, empty_as_none};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationErrors};

/// DTO for a risk or issue tracked against a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RiskIssue {
    #[schema(example = 7)]
    pub id: i32,
    #[schema(example = 3)]
    pub project_id: i32,
    #[schema(example = "Vendor may miss the launch date")]
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: RiskIssueType,
    pub severity: RiskSeverity,
    pub status: RiskIssueStatus,
    pub due_date: Option<DateTime<Utc>>,
    #[schema(example = 4)]
    pub assigned_to: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<domain::risk_issue::RiskIssue> for RiskIssue {
    fn from(value: domain::risk_issue::RiskIssue) -> Self {
        RiskIssue {
            id: value.id,
            project_id: value.project_id,
            title: value.title,
            description: value.description,
            kind: value.kind,
            severity: value.severity,
            status: value.status,
            due_date: value.due_date,
            assigned_to: value.assigned_to,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// DTO for recording a new risk or issue. `type`, `severity` and `status` default to
/// risk, low and open. An empty `due_date` is the same as leaving it off.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewRiskIssue {
    #[schema(example = 3)]
    pub project_id: Option<i32>,
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "Vendor may miss the launch date")]
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "risk")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "high")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "open")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    #[schema(example = "2024-04-01")]
    pub due_date: Option<String>,
    #[schema(example = 4)]
    pub assigned_to: Option<i32>,
}

impl TryFrom<NewRiskIssue> for domain::risk_issue::NewRiskIssue {
    type Error = ValidationErrors;

    fn try_from(value: NewRiskIssue) -> Result<Self, Self::Error> {
        let mut conversion = FieldConversion::new(value.validate());
        let project_id = conversion.required("project_id", value.project_id);
        let title = conversion.required("title", value.title);
        let kind = conversion.choice("type", value.kind.as_deref());
        let severity = conversion.choice("severity", value.severity.as_deref());
        let status = conversion.choice("status", value.status.as_deref());
        let due_date = conversion.timestamp("due_date", value.due_date.as_deref());

        let (Some(project_id), Some(title)) = (project_id, title) else {
            return Err(conversion.into_errors());
        };
        conversion.finish()?;

        Ok(domain::risk_issue::NewRiskIssue {
            project_id,
            title,
            description: value.description,
            kind: kind.unwrap_or_default(),
            severity: severity.unwrap_or_default(),
            status: status.unwrap_or_default(),
            due_date,
            assigned_to: value.assigned_to,
        })
    }
}

/// DTO for partially updating a risk or issue. Only `description`, `due_date` and
/// `assigned_to` can be cleared by sending null.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateRiskIssue {
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i32>)]
    pub project_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255))]
    #[schema(value_type = Option<String>)]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, example = "issue")]
    pub kind: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "critical")]
    pub severity: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "resolved")]
    pub status: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub due_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i32>)]
    pub assigned_to: Option<Option<i32>>,
}

impl TryFrom<UpdateRiskIssue> for domain::risk_issue::RiskIssueUpdate {
    type Error = ValidationErrors;

    fn try_from(value: UpdateRiskIssue) -> Result<Self, Self::Error> {
        let mut conversion = FieldConversion::new(value.validate());
        let project_id = conversion.present("project_id", value.project_id);
        let title = conversion.present("title", value.title);
        let kind = conversion.present("type", value.kind);
        let kind = conversion.choice("type", kind.as_deref());
        let severity = conversion.present("severity", value.severity);
        let severity = conversion.choice("severity", severity.as_deref());
        let status = conversion.present("status", value.status);
        let status = conversion.choice("status", status.as_deref());
        let due_date = conversion.nullable_timestamp(
            "due_date",
            value.due_date.as_ref().map(|due_date| due_date.as_deref()),
        );
        conversion.finish()?;

        Ok(domain::risk_issue::RiskIssueUpdate {
            project_id,
            title,
            description: value.description,
            kind,
            severity,
            status,
            due_date,
            assigned_to: value.assigned_to,
        })
    }
}

/// Filters for a risk and issue listing
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RiskIssueListQuery {
    /// Only include records belonging to this project
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Either risk or issue
    #[serde(
        rename = "type",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    /// Only include records with this status
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl TryFrom<RiskIssueListQuery> for domain::risk_issue::RiskIssueFilter {
    type Error = ValidationErrors;

    fn try_from(value: RiskIssueListQuery) -> Result<Self, Self::Error> {
        let mut conversion = FieldConversion::new(Ok(()));
        let filter = domain::risk_issue::RiskIssueFilter {
            project_id: conversion.identifier("project_id", value.project_id.as_deref()),
            kind: conversion.choice("type", value.kind.as_deref()),
            status: conversion.choice("status", value.status.as_deref()),
        };
        conversion.finish()?;

        Ok(filter)
    }
}
