use crate::domain;
use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::str::FromStr;
use utoipa::{OpenApi, ToSchema};
use validator::{ValidationError, ValidationErrors};

pub mod dashboard;
pub mod project;
pub mod risk_issue;
pub mod task;
pub mod time_entry;
pub mod user;

#[derive(OpenApi)]
#[openapi(components(schemas(
    MessageResponse,
    crate::routing_utils::BasicErrorResponse,
    domain::project::ProjectStatus,
    domain::task::TaskPriority,
    domain::task::TaskStatus,
    user::User,
    user::NewUser,
    project::Project,
    project::NewProject,
    project::UpdateProject,
    project::BudgetSummary,
    task::Task,
    task::NewTask,
    task::UpdateTask,
    domain::risk_issue::RiskIssueType,
    domain::risk_issue::RiskSeverity,
    domain::risk_issue::RiskIssueStatus,
    time_entry::TimeEntry,
    time_entry::NewTimeEntry,
    time_entry::UpdateTimeEntry,
    risk_issue::RiskIssue,
    risk_issue::NewRiskIssue,
    risk_issue::UpdateRiskIssue,
    dashboard::DashboardStats,
)))]
/// Captures OpenAPI schemas and canned responses defined in the DTO module
pub struct OpenApiSchemas;

/// DTO carrying a human-readable confirmation, such as after a record is deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Task deleted successfully")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        MessageResponse {
            message: message.into(),
        }
    }
}

/// Lets a nullable field tell apart "not provided" (outer [None]) from "set to null"
/// (`Some(None)`). Must be paired with `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Treats an empty query string value such as `?status=` as if the parameter was left off
pub fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;

    Ok(value.filter(|inner| !inner.trim().is_empty()))
}

/// Parses a timestamp sent by a client. Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (interpreted as UTC),
/// and bare dates, which are interpreted as midnight UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.with_timezone(&Utc));
    }
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(timestamp.and_utc());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|timestamp| timestamp.and_utc())
}

/// Largest amount a NUMERIC(12, 2) money column can hold
fn max_money() -> BigDecimal {
    BigDecimal::new(999_999_999_999_i64.into(), 2)
}

/// Collects every field problem found while turning a DTO into its domain form so they can all
/// be reported at once. Starts from the result of the DTO's derived validation.
pub(crate) struct FieldConversion {
    errors: ValidationErrors,
}

impl FieldConversion {
    pub fn new(validation: Result<(), ValidationErrors>) -> Self {
        FieldConversion {
            errors: validation.err().unwrap_or_else(ValidationErrors::new),
        }
    }

    fn reject(&mut self, field: &'static str, code: &'static str, message: Option<Cow<'static, str>>) {
        let mut error = ValidationError::new(code);
        error.message = message;
        self.errors.add(field, error);
    }

    /// Records a "required" failure if [value] is missing
    pub fn required<T>(&mut self, field: &'static str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.reject(field, "required", None);
        }

        value
    }

    /// For fields which may be left out of a partial update but can't be cleared. Records a
    /// "required" failure when the field was sent as null.
    pub fn present<T>(&mut self, field: &'static str, value: Option<Option<T>>) -> Option<T> {
        match value {
            Some(None) => {
                self.reject(field, "required", None);
                None
            }
            Some(Some(inner)) => Some(inner),
            None => None,
        }
    }

    /// Parses [value] into one of a closed set of values, recording an "in" failure if it isn't one
    pub fn choice<T: FromStr>(&mut self, field: &'static str, value: Option<&str>) -> Option<T> {
        let parsed = value?.parse().ok();
        if parsed.is_none() {
            self.reject(field, "in", None);
        }

        parsed
    }

    /// Parses a numeric identifier, recording an "integer" failure if [value] isn't one
    pub fn identifier(&mut self, field: &'static str, value: Option<&str>) -> Option<i32> {
        let parsed = value?.trim().parse().ok();
        if parsed.is_none() {
            self.reject(field, "integer", None);
        }

        parsed
    }

    pub fn timestamp(&mut self, field: &'static str, value: Option<&str>) -> Option<DateTime<Utc>> {
        let parsed = parse_timestamp(value?);
        if parsed.is_none() {
            self.reject(field, "date", None);
        }

        parsed
    }

    /// Parses a timestamp which may be explicitly cleared by sending null
    pub fn nullable_timestamp(
        &mut self,
        field: &'static str,
        value: Option<Option<&str>>,
    ) -> Option<Option<DateTime<Utc>>> {
        match value? {
            None => Some(None),
            Some(raw) => self.timestamp(field, Some(raw)).map(Some),
        }
    }

    /// Records a "range" failure if a supplied amount is negative
    pub fn non_negative<T: PartialOrd + Default>(
        &mut self,
        field: &'static str,
        value: Option<Option<T>>,
    ) {
        if let Some(Some(amount)) = value {
            if amount < T::default() {
                self.reject(field, "range", Some(Cow::from(format!(
                    "The {} must be at least 0.",
                    field.replace('_', " ")
                ))));
            }
        }
    }

    /// Rounds a money amount to cents the way the database would, recording a "range" failure
    /// unless it lies between 0 and the largest storable amount
    pub fn money(&mut self, field: &'static str, value: Option<BigDecimal>) -> Option<BigDecimal> {
        let amount = value?.with_scale_round(2, RoundingMode::HalfUp);
        let name = field.replace('_', " ");
        let problem = if amount < BigDecimal::from(0) {
            Some(format!("The {name} must be at least 0."))
        } else if amount > max_money() {
            Some(format!("The {name} must not be greater than {}.", max_money()))
        } else {
            None
        };

        match problem {
            Some(message) => {
                self.reject(field, "range", Some(Cow::from(message)));
                None
            }
            None => Some(amount),
        }
    }

    /// Checks a money amount which may be explicitly cleared by sending null
    pub fn nullable_money(
        &mut self,
        field: &'static str,
        value: Option<Option<BigDecimal>>,
    ) -> Option<Option<BigDecimal>> {
        match value? {
            None => Some(None),
            Some(amount) => self.money(field, Some(amount)).map(Some),
        }
    }

    pub fn into_errors(self) -> ValidationErrors {
        self.errors
    }

    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.errors().is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}
