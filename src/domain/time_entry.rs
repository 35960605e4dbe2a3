use crate::domain;
use crate::domain::task::driven_ports::DetectTask;
use crate::domain::time_entry::driving_ports::TimeEntryError;
use crate::external_connections::{
    ExternalConnectivity, TransactableExternalConnectivity, TransactionHandle,
};
use anyhow::Context;
use chrono::{DateTime, Utc};

/// Time logged against a task. `duration` is in whole minutes.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeEntry {
    pub id: i32,
    pub task_id: i32,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTimeEntry {
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<i32>,
}

/// A partial update to a time entry. Everything except `start_time` can be cleared.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeEntryUpdate {
    pub description: Option<Option<String>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<Option<DateTime<Utc>>>,
    pub duration: Option<Option<i32>>,
}

impl TimeEntryUpdate {
    pub fn changes_from(&self, current: &TimeEntry) -> TimeEntryUpdate {
        TimeEntryUpdate {
            description: domain::changed(&self.description, &current.description),
            start_time: domain::changed(&self.start_time, &current.start_time),
            end_time: domain::changed(&self.end_time, &current.end_time),
            duration: domain::changed(&self.duration, &current.duration),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == TimeEntryUpdate::default()
    }
}

/// Whole minutes from [start] to [end], rejecting an end before the start
pub fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i32, TimeEntryError> {
    if end < start {
        return Err(TimeEntryError::Invalid(domain::field_error(
            "end_time",
            "after_or_equal",
            "The end time must be a date after or equal to start time.",
        )));
    }

    i32::try_from((end - start).num_minutes()).map_err(|_| {
        TimeEntryError::Invalid(domain::field_error(
            "end_time",
            "range",
            "The end time is too far after the start time.",
        ))
    })
}

pub mod driven_ports {
    use super::*;

    pub trait TimeEntryReader {
        /// Entries logged against a task, most recently started first
        async fn for_task(
            &self,
            task_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<TimeEntry>, anyhow::Error>;
        /// Looks up an entry, only finding it if it belongs to [task_id]
        async fn by_id(
            &self,
            task_id: i32,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<TimeEntry>, anyhow::Error>;
    }

    pub trait TimeEntryWriter {
        async fn create_time_entry(
            &self,
            task_id: i32,
            entry: &NewTimeEntry,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<i32, anyhow::Error>;
        async fn update_time_entry(
            &self,
            id: i32,
            update: &TimeEntryUpdate,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<(), anyhow::Error>;
        async fn delete_time_entry(
            &self,
            task_id: i32,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use thiserror::Error;
    use validator::ValidationErrors;

    #[derive(Debug, Error)]
    pub enum TimeEntryError {
        #[error("time entry input was invalid: {0}")]
        Invalid(ValidationErrors),
        #[error("the requested time entry does not exist")]
        NotFound,
        #[error("the time entry's task does not exist")]
        TaskNotFound,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    pub trait TimeEntryPort {
        async fn list_time_entries(
            &self,
            task_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            t_detect: &impl DetectTask,
            te_read: &impl driven_ports::TimeEntryReader,
        ) -> Result<Vec<TimeEntry>, TimeEntryError>;
        async fn time_entry_by_id(
            &self,
            task_id: i32,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            te_read: &impl driven_ports::TimeEntryReader,
        ) -> Result<TimeEntry, TimeEntryError>;
        /// Logs time against a task. When the entry has an end but no duration, the duration
        /// is worked out from the start and end.
        async fn create_time_entry(
            &self,
            task_id: i32,
            entry: &NewTimeEntry,
            ext_cxn: &mut impl ExternalConnectivity,
            t_detect: &impl DetectTask,
            te_write: &impl driven_ports::TimeEntryWriter,
            te_read: &impl driven_ports::TimeEntryReader,
        ) -> Result<TimeEntry, TimeEntryError>;
        async fn update_time_entry(
            &self,
            task_id: i32,
            id: i32,
            update: &TimeEntryUpdate,
            ext_cxn: &mut impl TransactableExternalConnectivity,
            te_read: &impl driven_ports::TimeEntryReader,
            te_write: &impl driven_ports::TimeEntryWriter,
        ) -> Result<TimeEntry, TimeEntryError>;
        async fn delete_time_entry(
            &self,
            task_id: i32,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            te_write: &impl driven_ports::TimeEntryWriter,
        ) -> Result<(), TimeEntryError>;
    }
}

async fn verify_task_exists(
    task_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    t_detect: &impl DetectTask,
) -> Result<(), TimeEntryError> {
    let exists = t_detect
        .task_exists(task_id, ext_cxn)
        .await
        .context("checking task before touching its time entries")?;

    if exists {
        Ok(())
    } else {
        Err(TimeEntryError::TaskNotFound)
    }
}

pub struct TimeEntryService {}

impl driving_ports::TimeEntryPort for TimeEntryService {
    async fn list_time_entries(
        &self,
        task_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        t_detect: &impl DetectTask,
        te_read: &impl driven_ports::TimeEntryReader,
    ) -> Result<Vec<TimeEntry>, TimeEntryError> {
        verify_task_exists(task_id, &mut *ext_cxn, t_detect).await?;

        let entries = te_read
            .for_task(task_id, ext_cxn)
            .await
            .context("listing time entries")?;

        Ok(entries)
    }

    async fn time_entry_by_id(
        &self,
        task_id: i32,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        te_read: &impl driven_ports::TimeEntryReader,
    ) -> Result<TimeEntry, TimeEntryError> {
        te_read
            .by_id(task_id, id, ext_cxn)
            .await
            .context("fetching a time entry by id")?
            .ok_or(TimeEntryError::NotFound)
    }

    async fn create_time_entry(
        &self,
        task_id: i32,
        entry: &NewTimeEntry,
        ext_cxn: &mut impl ExternalConnectivity,
        t_detect: &impl DetectTask,
        te_write: &impl driven_ports::TimeEntryWriter,
        te_read: &impl driven_ports::TimeEntryReader,
    ) -> Result<TimeEntry, TimeEntryError> {
        verify_task_exists(task_id, &mut *ext_cxn, t_detect).await?;

        let mut entry = entry.clone();
        if let Some(end_time) = entry.end_time {
            let worked = minutes_between(entry.start_time, end_time)?;
            if entry.duration.is_none() {
                entry.duration = Some(worked);
            }
        }

        let new_id = te_write
            .create_time_entry(task_id, &entry, &mut *ext_cxn)
            .await
            .context("creating a time entry")?;
        tracing::debug!(task_id, time_entry_id = new_id, "Logged time");

        te_read
            .by_id(task_id, new_id, ext_cxn)
            .await
            .context("reading back a newly created time entry")?
            .ok_or_else(|| {
                TimeEntryError::PortError(anyhow::anyhow!("time entry {new_id} vanished after insert"))
            })
    }

    async fn update_time_entry(
        &self,
        task_id: i32,
        id: i32,
        update: &TimeEntryUpdate,
        ext_cxn: &mut impl TransactableExternalConnectivity,
        te_read: &impl driven_ports::TimeEntryReader,
        te_write: &impl driven_ports::TimeEntryWriter,
    ) -> Result<TimeEntry, TimeEntryError> {
        let mut txn = ext_cxn
            .start_transaction()
            .await
            .context("starting time entry update transaction")?;

        let current = te_read
            .by_id(task_id, id, &mut txn)
            .await
            .context("fetching time entry to update")?
            .ok_or(TimeEntryError::NotFound)?;

        let mut update = update.clone();
        let start_time = update.start_time.unwrap_or(current.start_time);
        let end_time = update.end_time.unwrap_or(current.end_time);
        if let Some(end_time) = end_time {
            let worked = minutes_between(start_time, end_time)?;
            let times_moved = update.start_time.is_some() || update.end_time.is_some();
            if times_moved && update.duration.is_none() {
                update.duration = Some(Some(worked));
            }
        }

        let changes = update.changes_from(&current);
        if changes.is_empty() {
            tracing::debug!(time_entry_id = id, "Time entry update made no changes");
            return Ok(current);
        }

        te_write
            .update_time_entry(id, &changes, &mut txn)
            .await
            .context("updating a time entry")?;
        let updated = te_read
            .by_id(task_id, id, &mut txn)
            .await
            .context("reading back an updated time entry")?
            .ok_or(TimeEntryError::NotFound)?;
        txn.commit().await.context("committing time entry update")?;

        Ok(updated)
    }

    async fn delete_time_entry(
        &self,
        task_id: i32,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        te_write: &impl driven_ports::TimeEntryWriter,
    ) -> Result<(), TimeEntryError> {
        let removed = te_write
            .delete_time_entry(task_id, id, ext_cxn)
            .await
            .context("deleting a time entry")?;

        if removed {
            Ok(())
        } else {
            Err(TimeEntryError::NotFound)
        }
    }
}
