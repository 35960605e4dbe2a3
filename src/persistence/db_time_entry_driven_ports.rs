use super::NewId;
use crate::domain;
use crate::domain::time_entry::{NewTimeEntry, TimeEntry, TimeEntryUpdate};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder, query_as};

const TIME_ENTRY_COLUMNS: &str =
    "te.id, te.task_id, te.description, te.start_time, te.end_time, te.duration, te.created_at, te.updated_at";

#[derive(sqlx::FromRow)]
struct TimeEntryRow {
    id: i32,
    task_id: i32,
    description: Option<String>,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    duration: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TimeEntryRow> for TimeEntry {
    fn from(value: TimeEntryRow) -> Self {
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

pub struct DbTimeEntryReader {}

impl domain::time_entry::driven_ports::TimeEntryReader for DbTimeEntryReader {
    async fn for_task(
        &self,
        task_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<TimeEntry>, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let entries = query_as::<_, TimeEntryRow>(&format!(
            "SELECT {TIME_ENTRY_COLUMNS} FROM time_entries te WHERE te.task_id = $1 \
             ORDER BY te.start_time DESC, te.id DESC"
        ))
        .bind(task_id)
        .fetch_all(connection.borrow_connection())
        .await
        .context("Fetching time entries for a task")?;

        Ok(entries.into_iter().map(TimeEntry::from).collect())
    }

    async fn by_id(
        &self,
        task_id: i32,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<TimeEntry>, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let entry = query_as::<_, TimeEntryRow>(&format!(
            "SELECT {TIME_ENTRY_COLUMNS} FROM time_entries te WHERE te.id = $1 AND te.task_id = $2"
        ))
        .bind(id)
        .bind(task_id)
        .fetch_optional(connection.borrow_connection())
        .await
        .context("Fetching a time entry by id")?;

        Ok(entry.map(TimeEntry::from))
    }
}

pub struct DbTimeEntryWriter {}

impl domain::time_entry::driven_ports::TimeEntryWriter for DbTimeEntryWriter {
    async fn create_time_entry(
        &self,
        task_id: i32,
        entry: &NewTimeEntry,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<i32, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let new_entry = query_as::<_, NewId>(
            "INSERT INTO time_entries(task_id, description, start_time, end_time, duration) \
             VALUES ($1, $2, $3, $4, $5) RETURNING time_entries.id",
        )
        .bind(task_id)
        .bind(&entry.description)
        .bind(entry.start_time)
        .bind(entry.end_time)
        .bind(entry.duration)
        .fetch_one(connection.borrow_connection())
        .await
        .context("Inserting new time entry")?;

        Ok(new_entry.id)
    }

    async fn update_time_entry(
        &self,
        id: i32,
        update: &TimeEntryUpdate,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<(), anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let mut statement =
            QueryBuilder::<Postgres>::new("UPDATE time_entries SET updated_at = now()");
        if let Some(description) = &update.description {
            statement.push(", description = ").push_bind(description.clone());
        }
        if let Some(start_time) = update.start_time {
            statement.push(", start_time = ").push_bind(start_time);
        }
        if let Some(end_time) = update.end_time {
            statement.push(", end_time = ").push_bind(end_time);
        }
        if let Some(duration) = update.duration {
            statement.push(", duration = ").push_bind(duration);
        }
        statement.push(" WHERE id = ").push_bind(id);

        statement
            .build()
            .execute(connection.borrow_connection())
            .await
            .context("Updating a time entry")?;

        Ok(())
    }

    async fn delete_time_entry(
        &self,
        task_id: i32,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let result = sqlx::query("DELETE FROM time_entries WHERE id = $1 AND task_id = $2")
            .bind(id)
            .bind(task_id)
            .execute(connection.borrow_connection())
            .await
            .context("Deleting a time entry")?;

        Ok(result.rows_affected() > 0)
    }
}
