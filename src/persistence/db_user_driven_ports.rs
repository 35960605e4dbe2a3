use super::{Count, NewId};
use crate::domain;
use crate::domain::user::{CreateUser, User};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::query_as;

pub struct DbDetectUser {}

impl domain::user::driven_ports::DetectUser for DbDetectUser {
    async fn user_exists(
        &self,
        user_id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let user_with_id_count =
            query_as::<_, Count>("SELECT count(*) AS count FROM users u WHERE u.id = $1")
                .bind(user_id)
                .fetch_one(connection.borrow_connection())
                .await
                .context("Detecting user with ID")?;

        Ok(user_with_id_count.count() > 0)
    }

    async fn user_with_email_exists(
        &self,
        email: &str,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let user_with_email_count =
            query_as::<_, Count>("SELECT count(*) AS count FROM users u WHERE u.email = $1")
                .bind(email)
                .fetch_one(connection.borrow_connection())
                .await
                .context("Detecting user via email")?;

        Ok(user_with_email_count.count() > 0)
    }
}

pub struct DbReadUsers {}

#[derive(sqlx::FromRow)]
pub(super) struct UserRow {
    id: i32,
    name: String,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(value: UserRow) -> Self {
        User {
            id: value.id,
            name: value.name,
            email: value.email,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl domain::user::driven_ports::UserReader for DbReadUsers {
    async fn all(&self, ext_cxn: &mut impl ExternalConnectivity) -> Result<Vec<User>, anyhow::Error> {
        let mut connection = ext_cxn.database_cxn().await?;

        let users: Vec<User> = query_as::<_, UserRow>(
            "SELECT id, name, email, created_at, updated_at FROM users ORDER BY id",
        )
        .fetch_all(connection.borrow_connection())
        .await
        .context("Fetching all users")?
        .into_iter()
        .map(User::from)
        .collect();

        Ok(users)
    }

    async fn by_id(
        &self,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<User>, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let user = query_as::<_, UserRow>(
            "SELECT id, name, email, created_at, updated_at FROM users u WHERE u.id = $1",
        )
        .bind(id)
        .fetch_optional(cxn_handle.borrow_connection())
        .await
        .context("Fetching a user by id")?;

        Ok(user.map(User::from))
    }
}

pub struct DbWriteUsers {}

impl domain::user::driven_ports::UserWriter for DbWriteUsers {
    async fn create_user(
        &self,
        user: &CreateUser,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<i32, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let new_user = query_as::<_, NewId>(
            "INSERT INTO users(name, email) VALUES ($1, $2) RETURNING users.id",
        )
        .bind(&user.name)
        .bind(&user.email)
        .fetch_one(cxn_handle.borrow_connection())
        .await
        .context("Inserting new user")?;

        Ok(new_user.id)
    }

    async fn delete_user(
        &self,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, anyhow::Error> {
        let mut cxn_handle = ext_cxn.database_cxn().await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(cxn_handle.borrow_connection())
            .await
            .context("Deleting a user")?;

        Ok(result.rows_affected() > 0)
    }
}
