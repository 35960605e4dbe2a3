use crate::domain;
use crate::domain::user::driving_ports::UserError;
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// A person who can manage projects and be assigned tasks
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
}

pub mod driven_ports {
    use super::*;

    pub trait UserReader {
        async fn all(&self, ext_cxn: &mut impl ExternalConnectivity)
        -> Result<Vec<User>, anyhow::Error>;
        async fn by_id(
            &self,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<User>, anyhow::Error>;
    }

    pub trait UserWriter {
        async fn create_user(
            &self,
            user: &CreateUser,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<i32, anyhow::Error>;

        /// Removes the user, returning false if there was nothing to remove
        async fn delete_user(
            &self,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
    }

    pub trait DetectUser {
        async fn user_exists(
            &self,
            user_id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;

        async fn user_with_email_exists(
            &self,
            email: &str,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use validator::ValidationErrors;

    #[derive(Debug, Error)]
    pub enum UserError {
        #[error("user input was invalid: {0}")]
        Invalid(ValidationErrors),
        #[error("the requested user does not exist")]
        NotFound,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    pub trait UserPort {
        async fn get_users(
            &self,
            ext_cxn: &mut impl ExternalConnectivity,
            u_reader: &impl driven_ports::UserReader,
        ) -> Result<Vec<User>, UserError>;
        async fn user_by_id(
            &self,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            u_reader: &impl driven_ports::UserReader,
        ) -> Result<User, UserError>;
        async fn create_user(
            &self,
            new_user: &CreateUser,
            ext_cxn: &mut impl ExternalConnectivity,
            u_detect: &impl driven_ports::DetectUser,
            u_writer: &impl driven_ports::UserWriter,
            u_reader: &impl driven_ports::UserReader,
        ) -> Result<User, UserError>;
        async fn delete_user(
            &self,
            id: i32,
            ext_cxn: &mut impl ExternalConnectivity,
            u_writer: &impl driven_ports::UserWriter,
        ) -> Result<(), UserError>;
    }
}

#[derive(Debug, Error)]
pub enum UserExistsErr {
    #[error("user with ID {0} does not exist")]
    UserDoesNotExist(i32),

    #[error(transparent)]
    PortError(#[from] anyhow::Error),
}

pub(crate) async fn verify_user_exists(
    id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    user_detect: &impl driven_ports::DetectUser,
) -> Result<(), UserExistsErr> {
    let does_user_exist = user_detect.user_exists(id, ext_cxn).await?;

    if does_user_exist {
        Ok(())
    } else {
        Err(UserExistsErr::UserDoesNotExist(id))
    }
}

pub struct UserService {}

impl driving_ports::UserPort for UserService {
    async fn get_users(
        &self,
        ext_cxn: &mut impl ExternalConnectivity,
        u_reader: &impl driven_ports::UserReader,
    ) -> Result<Vec<User>, UserError> {
        let users = u_reader
            .all(ext_cxn)
            .await
            .context("fetching all users")?;

        Ok(users)
    }

    async fn user_by_id(
        &self,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        u_reader: &impl driven_ports::UserReader,
    ) -> Result<User, UserError> {
        u_reader
            .by_id(id, ext_cxn)
            .await
            .context("fetching a user by id")?
            .ok_or(UserError::NotFound)
    }

    async fn create_user(
        &self,
        new_user: &CreateUser,
        ext_cxn: &mut impl ExternalConnectivity,
        u_detect: &impl driven_ports::DetectUser,
        u_writer: &impl driven_ports::UserWriter,
        u_reader: &impl driven_ports::UserReader,
    ) -> Result<User, UserError> {
        let email_taken = u_detect
            .user_with_email_exists(&new_user.email, &mut *ext_cxn)
            .await
            .context("looking up user email during creation")?;
        if email_taken {
            return Err(UserError::Invalid(domain::field_error(
                "email",
                "unique",
                "The email has already been taken.",
            )));
        }

        let new_id = u_writer
            .create_user(new_user, &mut *ext_cxn)
            .await
            .context("trying to create user at service level")?;

        u_reader
            .by_id(new_id, ext_cxn)
            .await
            .context("reading back a newly created user")?
            .ok_or_else(|| UserError::PortError(anyhow::anyhow!("user {new_id} vanished after insert")))
    }

    async fn delete_user(
        &self,
        id: i32,
        ext_cxn: &mut impl ExternalConnectivity,
        u_writer: &impl driven_ports::UserWriter,
    ) -> Result<(), UserError> {
        let removed = u_writer
            .delete_user(id, ext_cxn)
            .await
            .context("deleting a user")?;

        if removed {
            Ok(())
        } else {
            Err(UserError::NotFound)
        }
    }
}
