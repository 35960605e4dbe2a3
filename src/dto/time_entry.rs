use crate::domain;
use crate::dto::{FieldConversion, double_option};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

/// DTO for time logged against a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TimeEntry {
    #[schema(example = 12)]
    pub id: i32,
    #[schema(example = 10)]
    pub task_id: i32,
    #[schema(example = "Wireframes")]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Minutes worked
    #[schema(example = 90)]
    pub duration: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<domain::time_entry::TimeEntry> for TimeEntry {
    fn from(value: domain::time_entry::TimeEntry) -> Self {
        TimeEntry {
            id: value.id,
            task_id: value.task_id,
            description: value.description,
            start_time: value.start_time,
            end_time: value.end_time,
            duration: value.duration,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// DTO for logging time against a task. Either `start_time` or, for an entry covering a day,
/// `date` must be sent. Finished work carries an `end_time` or a `duration` in minutes, and
/// an entry with neither is a running timer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewTimeEntry {
    #[schema(example = "Wireframes")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "2024-03-15T09:00:00Z")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "2024-03-15")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "2024-03-15T10:30:00Z")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0))]
    #[schema(example = 90)]
    pub duration: Option<i32>,
}

impl TryFrom<NewTimeEntry> for domain::time_entry::NewTimeEntry {
    type Error = ValidationErrors;

    fn try_from(value: NewTimeEntry) -> Result<Self, Self::Error> {
        let mut conversion = FieldConversion::new(value.validate());
        let start_time = match (value.start_time.as_deref(), value.date.as_deref()) {
            (Some(start_time), _) => conversion.timestamp("start_time", Some(start_time)),
            (None, Some(date)) => conversion.timestamp("date", Some(date)),
            (None, None) => conversion.required("start_time", None),
        };
        let end_time = conversion.timestamp("end_time", value.end_time.as_deref());

        let Some(start_time) = start_time else {
            return Err(conversion.into_errors());
        };
        conversion.finish()?;

        Ok(domain::time_entry::NewTimeEntry {
            description: value.description,
            start_time,
            end_time,
            duration: value.duration,
        })
    }
}

/// DTO for partially updating a time entry, such as stopping a running timer by sending its
/// `end_time`. Everything except `start_time` can be cleared by sending null.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateTimeEntry {
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub start_time: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "2024-03-15T10:30:00Z")]
    pub end_time: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i32>)]
    pub duration: Option<Option<i32>>,
}

impl TryFrom<UpdateTimeEntry> for domain::time_entry::TimeEntryUpdate {
    type Error = ValidationErrors;

    fn try_from(value: UpdateTimeEntry) -> Result<Self, Self::Error> {
        let mut conversion = FieldConversion::new(Ok(()));
        let start_time = conversion.present("start_time", value.start_time);
        let start_time = conversion.timestamp("start_time", start_time.as_deref());
        let end_time = conversion.nullable_timestamp(
            "end_time",
            value.end_time.as_ref().map(|end_time| end_time.as_deref()),
        );
        conversion.non_negative("duration", value.duration);
        conversion.finish()?;

        Ok(domain::time_entry::TimeEntryUpdate {
            description: value.description,
            start_time,
            end_time,
            duration: value.duration,
        })
    }
}
