use crate::domain;
use crate::domain::task::{TaskPriority, TaskStatus};
use crate::dto::project::Project;
use crate::dto::user::User;
use crate::dto::{FieldConversion, double_option, empty_as_none};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationErrors};

/// DTO for a task returned by the API, along with its project and assignee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Task {
    #[schema(example = 10)]
    pub id: i32,
    #[schema(example = "Design homepage")]
    pub title: String,
    pub description: Option<String>,
    #[schema(example = 3)]
    pub project_id: i32,
    #[schema(example = 4)]
    pub assignee_id: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    #[schema(example = 6.5)]
    pub estimated_hours: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub project: Project,
    pub assignee: Option<User>,
}

impl From<domain::task::TaskDetails> for Task {
    fn from(value: domain::task::TaskDetails) -> Self {
        let domain::task::TaskDetails {
            task,
            project,
            assignee,
        } = value;

        Task {
            id: task.id,
            title: task.title,
            description: task.description,
            project_id: task.project_id,
            assignee_id: task.assignee_id,
            due_date: task.due_date,
            priority: task.priority,
            status: task.status,
            estimated_hours: task.estimated_hours,
            created_at: task.created_at,
            updated_at: task.updated_at,
            project: Project::from(project),
            assignee: assignee.map(User::from),
        }
    }
}

/// DTO for creating a new task via the API
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewTask {
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "Design homepage")]
    pub title: Option<String>,
    pub description: Option<String>,
    #[schema(example = 3)]
    pub project_id: Option<i32>,
    #[schema(example = 4)]
    pub assignee_id: Option<i32>,
    #[schema(example = "2024-04-01")]
    pub due_date: Option<String>,
    #[schema(example = "high")]
    pub priority: Option<String>,
    #[schema(example = "pending")]
    pub status: Option<String>,
    #[validate(range(min = 0.0))]
    #[schema(example = 6.5)]
    pub estimated_hours: Option<f64>,
}

impl TryFrom<NewTask> for domain::task::NewTask {
    type Error = ValidationErrors;

    fn try_from(value: NewTask) -> Result<Self, Self::Error> {
        let mut conversion = FieldConversion::new(value.validate());
        let title = conversion.required("title", value.title);
        let project_id = conversion.required("project_id", value.project_id);
        let assignee_id = conversion.required("assignee_id", value.assignee_id);
        let due_date = conversion.required("due_date", value.due_date.as_deref());
        let due_date = conversion.timestamp("due_date", due_date);
        let priority = conversion.required("priority", value.priority.as_deref());
        let priority = conversion.choice("priority", priority);
        let status = conversion.required("status", value.status.as_deref());
        let status = conversion.choice("status", status);

        let (Some(title), Some(project_id), Some(assignee_id), Some(due_date), Some(priority), Some(status)) =
            (title, project_id, assignee_id, due_date, priority, status)
        else {
            return Err(conversion.into_errors());
        };
        conversion.finish()?;

        Ok(domain::task::NewTask {
            title,
            description: value.description,
            project_id,
            assignee_id,
            due_date,
            priority,
            status,
            estimated_hours: value.estimated_hours,
        })
    }
}

/// DTO for partially updating a task. Fields left out are unchanged. Only `description` and
/// `estimated_hours` can be cleared by sending null; null for any other field is rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateTask {
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255))]
    #[schema(value_type = Option<String>, example = "Design homepage")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i32>)]
    pub project_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i32>)]
    pub assignee_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "2024-04-01")]
    pub due_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "medium")]
    pub priority: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "completed")]
    pub status: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<f64>)]
    pub estimated_hours: Option<Option<f64>>,
}

impl TryFrom<UpdateTask> for domain::task::TaskUpdate {
    type Error = ValidationErrors;

    fn try_from(value: UpdateTask) -> Result<Self, Self::Error> {
        let mut conversion = FieldConversion::new(value.validate());
        let title = conversion.present("title", value.title);
        let project_id = conversion.present("project_id", value.project_id);
        let assignee_id = conversion.present("assignee_id", value.assignee_id);
        let due_date = conversion.present("due_date", value.due_date);
        let due_date = conversion.timestamp("due_date", due_date.as_deref());
        let priority = conversion.present("priority", value.priority);
        let priority = conversion.choice("priority", priority.as_deref());
        let status = conversion.present("status", value.status);
        let status = conversion.choice("status", status.as_deref());
        conversion.non_negative("estimated_hours", value.estimated_hours);
        conversion.finish()?;

        Ok(domain::task::TaskUpdate {
            title,
            description: value.description,
            project_id,
            assignee_id,
            due_date,
            priority,
            status,
            estimated_hours: value.estimated_hours,
        })
    }
}

/// Filters and ordering for a task listing
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskListQuery {
    /// Only include tasks with this status
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Only include tasks with this priority
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Only include tasks belonging to this project
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Only include tasks assigned to this user
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// One of id, title, due_date, priority, status, estimated_hours, created_at or updated_at.
    /// Defaults to due_date.
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    /// Either asc or desc. Defaults to asc.
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<String>,
}

/// Only the ordering part of [TaskListQuery], used when listing the tasks of a single project
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskSortQuery {
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<String>,
}

fn convert_sort(
    conversion: &mut FieldConversion,
    sort_by: Option<&str>,
    sort_direction: Option<&str>,
) -> domain::task::TaskSort {
    domain::task::TaskSort {
        field: conversion.choice("sort_by", sort_by).unwrap_or_default(),
        direction: conversion
            .choice("sort_direction", sort_direction)
            .unwrap_or_default(),
    }
}

impl TryFrom<TaskSortQuery> for domain::task::TaskSort {
    type Error = ValidationErrors;

    fn try_from(value: TaskSortQuery) -> Result<Self, Self::Error> {
        let mut conversion = FieldConversion::new(Ok(()));
        let sort = convert_sort(
            &mut conversion,
            value.sort_by.as_deref(),
            value.sort_direction.as_deref(),
        );
        conversion.finish()?;

        Ok(sort)
    }
}

impl TryFrom<TaskListQuery> for domain::task::TaskQuery {
    type Error = ValidationErrors;

    fn try_from(value: TaskListQuery) -> Result<Self, Self::Error> {
        let mut conversion = FieldConversion::new(Ok(()));
        let filter = domain::task::TaskFilter {
            status: conversion.choice("status", value.status.as_deref()),
            priority: conversion.choice("priority", value.priority.as_deref()),
            project_id: conversion.identifier("project", value.project.as_deref()),
            assignee_id: conversion.identifier("assignee", value.assignee.as_deref()),
        };
        let sort = convert_sort(
            &mut conversion,
            value.sort_by.as_deref(),
            value.sort_direction.as_deref(),
        );
        conversion.finish()?;

        Ok(domain::task::TaskQuery { filter, sort })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SortDirection;
    use crate::domain::task::TaskSortField;
    use speculoos::prelude::*;

    fn valid_new_task() -> NewTask {
        NewTask {
            title: Some("Design homepage".to_owned()),
            description: None,
            project_id: Some(1),
            assignee_id: Some(2),
            due_date: Some("2024-04-01".to_owned()),
            priority: Some("high".to_owned()),
            status: Some("pending".to_owned()),
            estimated_hours: Some(4.0),
        }
    }

    mod new_task {
        use super::*;

        #[test]
        fn converts_valid_task() {
            assert_that!(domain::task::NewTask::try_from(valid_new_task()))
                .is_ok()
                .matches(|task| {
                    task.priority == TaskPriority::High
                        && task.status == TaskStatus::Pending
                        && task.assignee_id == 2
                });
        }

        #[test]
        fn rejects_urgent_priority() {
            let new_task = NewTask {
                priority: Some("urgent".to_owned()),
                ..valid_new_task()
            };

            let conversion_result = domain::task::NewTask::try_from(new_task);
            let Err(errors) = conversion_result else {
                panic!("Expected validation to fail, got {conversion_result:#?}");
            };
            let field_errors = errors.field_errors();
            assert_eq!(vec!["priority"], field_errors.keys().copied().collect::<Vec<_>>());
        }

        #[test]
        fn reports_every_missing_field() {
            let conversion_result = domain::task::NewTask::try_from(NewTask::default());
            let Err(errors) = conversion_result else {
                panic!("Expected validation to fail, got {conversion_result:#?}");
            };
            let field_errors = errors.field_errors();
            for field in ["title", "project_id", "assignee_id", "due_date", "priority", "status"] {
                assert!(field_errors.contains_key(field), "missing error for {field}");
            }
        }

        #[test]
        fn rejects_overlong_title_and_negative_hours() {
            let new_task = NewTask {
                title: Some("x".repeat(256)),
                estimated_hours: Some(-2.0),
                ..valid_new_task()
            };

            let conversion_result = domain::task::NewTask::try_from(new_task);
            let Err(errors) = conversion_result else {
                panic!("Expected validation to fail, got {conversion_result:#?}");
            };
            let field_errors = errors.field_errors();
            assert!(field_errors.contains_key("title"));
            assert!(field_errors.contains_key("estimated_hours"));
        }
    }

    mod update_task {
        use super::*;

        #[test]
        fn status_only_update() {
            let update: UpdateTask =
                serde_json::from_str(r#"{"status": "completed"}"#).expect("valid update json");

            assert_that!(domain::task::TaskUpdate::try_from(update)).is_ok_containing(
                domain::task::TaskUpdate {
                    status: Some(TaskStatus::Completed),
                    ..Default::default()
                },
            );
        }

        #[test]
        fn clears_estimated_hours() {
            let update: UpdateTask = serde_json::from_str(r#"{"estimated_hours": null}"#)
                .expect("valid update json");

            let domain_update =
                domain::task::TaskUpdate::try_from(update).expect("update should be valid");
            assert_eq!(Some(None), domain_update.estimated_hours);
        }

        #[test]
        fn rejects_unknown_status() {
            let update = UpdateTask {
                status: Some(Some("blocked".to_owned())),
                ..Default::default()
            };

            let conversion_result = domain::task::TaskUpdate::try_from(update);
            assert_that!(conversion_result).is_err();
        }

        #[test]
        fn null_required_fields_are_rejected() {
            let update: UpdateTask = serde_json::from_str(
                r#"{"title": null, "status": null, "priority": null, "description": null}"#,
            )
            .expect("valid update json");

            let conversion_result = domain::task::TaskUpdate::try_from(update);
            let Err(errors) = conversion_result else {
                panic!("Expected validation to fail, got {conversion_result:#?}");
            };
            let field_errors = errors.field_errors();
            let mut fields: Vec<&str> = field_errors.keys().copied().collect();
            fields.sort();
            assert_eq!(vec!["priority", "status", "title"], fields);
            assert!(
                field_errors
                    .values()
                    .all(|errors| errors.iter().all(|error| error.code == "required"))
            );
        }
    }

    mod list_query {
        use super::*;

        #[test]
        fn defaults_to_due_date_ascending() {
            let query = domain::task::TaskQuery::try_from(TaskListQuery::default())
                .expect("empty query should be valid");

            assert_eq!(TaskSortField::DueDate, query.sort.field);
            assert_eq!(SortDirection::Ascending, query.sort.direction);
            assert_eq!(domain::task::TaskFilter::default(), query.filter);
        }

        #[test]
        fn parses_filters_and_sort() {
            let raw: TaskListQuery = serde_urlencoded_like(
                "status=in_progress&project=3&sort_by=priority&sort_direction=DESC&assignee=",
            );

            let query = domain::task::TaskQuery::try_from(raw).expect("query should be valid");
            assert_eq!(Some(TaskStatus::InProgress), query.filter.status);
            assert_eq!(Some(3), query.filter.project_id);
            assert_eq!(None, query.filter.assignee_id);
            assert_eq!(TaskSortField::Priority, query.sort.field);
            assert_eq!(SortDirection::Descending, query.sort.direction);
        }

        #[test]
        fn rejects_unknown_sort_field() {
            let raw = TaskListQuery {
                sort_by: Some("assignee".to_owned()),
                ..Default::default()
            };

            let conversion_result = domain::task::TaskQuery::try_from(raw);
            let Err(errors) = conversion_result else {
                panic!("Expected validation to fail, got {conversion_result:#?}");
            };
            assert!(errors.field_errors().contains_key("sort_by"));
        }

        /// Deserializes a query string the same way axum's query extractor does
        fn serde_urlencoded_like(query: &str) -> TaskListQuery {
            let uri: axum::http::Uri = format!("/tasks?{query}").parse().expect("valid uri");
            axum::extract::Query::<TaskListQuery>::try_from_uri(&uri)
                .expect("query should deserialize")
                .0
        }
    }
}
