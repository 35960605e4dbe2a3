use crate::domain;
use crate::dto::FieldConversion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

/// DTO for a user returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    #[schema(example = 4)]
    pub id: i32,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane@example.com")]
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<domain::user::User> for User {
    fn from(value: domain::user::User) -> Self {
        User {
            id: value.id,
            name: value.name,
            email: value.email,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// DTO for creating a new user via the API
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewUser {
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "Jane Doe")]
    pub name: Option<String>,
    #[validate(email, length(max = 255))]
    #[schema(example = "jane@example.com")]
    pub email: Option<String>,
}

impl TryFrom<NewUser> for domain::user::CreateUser {
    type Error = ValidationErrors;

    fn try_from(value: NewUser) -> Result<Self, Self::Error> {
        let mut conversion = FieldConversion::new(value.validate());
        let name = conversion.required("name", value.name);
        let email = conversion.required("email", value.email);

        let (Some(name), Some(email)) = (name, email) else {
            return Err(conversion.into_errors());
        };
        conversion.finish()?;

        Ok(domain::user::CreateUser { name, email })
    }
}
