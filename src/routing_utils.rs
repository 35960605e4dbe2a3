use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_macros::{FromRequest, FromRequestParts};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use validator::{ValidationError, ValidationErrors};

/// Contains diagnostic information about an API failure
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct BasicErrorResponse {
    /// Summary of what went wrong
    #[schema(example = "Validation failed")]
    pub message: String,
    /// Problems with specific input fields, keyed by field name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = json!({"priority": ["The selected priority is invalid."]}))]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
    /// The underlying cause of an internal failure or unreadable input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BasicErrorResponse {
    fn message_only(message: impl Into<String>) -> Self {
        BasicErrorResponse {
            message: message.into(),
            errors: None,
            error: None,
        }
    }
}

/// Turns a single validation failure into a sentence a person can read
fn describe_field_error(field: &str, error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }

    let name = field.replace('_', " ");
    let param = |key: &str| error.params.get(key).map(|value| value.to_string());
    match error.code.as_ref() {
        "required" => format!("The {name} field is required."),
        "length" => {
            let actual_length = error
                .params
                .get("value")
                .and_then(|value| value.as_str())
                .map(|value| value.chars().count());
            let min = error.params.get("min").and_then(|value| value.as_u64());
            match (actual_length, min) {
                (Some(length), Some(min)) if (length as u64) < min => {
                    format!("The {name} must be at least {min} characters.")
                }
                _ => match param("max") {
                    Some(max) => format!("The {name} must not be greater than {max} characters."),
                    None => format!("The {name} has an invalid length."),
                },
            }
        }
        "range" => match param("min") {
            Some(min) => format!("The {name} must be at least {min}."),
            None => format!("The {name} is out of range."),
        },
        "email" => format!("The {name} must be a valid email address."),
        "in" => format!("The selected {name} is invalid."),
        "integer" => format!("The {name} must be an integer."),
        "date" => format!("The {name} is not a valid date."),
        _ => format!("The {name} is invalid."),
    }
}

/// Response type that wraps validation errors and turns them into [BasicErrorResponse]s
#[derive(Debug)]
pub struct ValidationErrorResponse(ValidationErrors);

impl IntoResponse for ValidationErrorResponse {
    fn into_response(self) -> Response {
        let errors: BTreeMap<String, Vec<String>> = self
            .0
            .field_errors()
            .into_iter()
            .map(|(field, field_errors)| {
                let messages = field_errors
                    .iter()
                    .map(|error| describe_field_error(field, error))
                    .collect();
                (field.to_owned(), messages)
            })
            .collect();

        (
            StatusCode::UNPROCESSABLE_ENTITY,
            axum::Json(BasicErrorResponse {
                message: "Validation failed".to_owned(),
                errors: Some(errors),
                error: None,
            }),
        )
            .into_response()
    }
}

impl From<ValidationErrors> for ValidationErrorResponse {
    fn from(value: ValidationErrors) -> Self {
        Self(value)
    }
}

/// Response type for when the requested entity doesn't exist. Contains the entity's name.
pub struct NotFoundResponse(pub &'static str);

impl IntoResponse for NotFoundResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::NOT_FOUND,
            axum::Json(BasicErrorResponse::message_only(format!("{} not found", self.0))),
        )
            .into_response()
    }
}

/// Response type for unexpected failures. The cause is reported alongside the message.
pub struct GenericErrorResponse {
    pub message: &'static str,
    pub cause: anyhow::Error,
}

impl IntoResponse for GenericErrorResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(BasicErrorResponse {
                message: self.message.to_owned(),
                errors: None,
                error: Some(format!("{:#}", self.cause)),
            }),
        )
            .into_response()
    }
}

/// Response type for requests that lack credentials
pub struct UnauthorizedResponse;

impl IntoResponse for UnauthorizedResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            axum::Json(BasicErrorResponse::message_only("Unauthenticated.")),
        )
            .into_response()
    }
}

/// Wrapper for [axum::Json] which customizes the error response to use our
/// data structure for API errors
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(JsonErrorResponse))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Response type representing JSON parse errors
pub struct JsonErrorResponse {
    status: StatusCode,
    parse_problem: String,
}

impl From<JsonRejection> for JsonErrorResponse {
    fn from(value: JsonRejection) -> Self {
        JsonErrorResponse {
            status: value.status(),
            parse_problem: value.body_text(),
        }
    }
}

impl IntoResponse for JsonErrorResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            axum::Json(BasicErrorResponse {
                message: "The request body could not be read.".to_owned(),
                errors: None,
                error: Some(self.parse_problem),
            }),
        )
            .into_response()
    }
}

/// Wrapper for [axum::extract::Query] which reports unreadable query strings with
/// our data structure for API errors
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(QueryErrorResponse))]
pub struct Query<T>(pub T);

/// Response type representing query string parse errors
pub struct QueryErrorResponse {
    status: StatusCode,
    parse_problem: String,
}

impl From<QueryRejection> for QueryErrorResponse {
    fn from(value: QueryRejection) -> Self {
        QueryErrorResponse {
            status: value.status(),
            parse_problem: value.body_text(),
        }
    }
}

impl IntoResponse for QueryErrorResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            axum::Json(BasicErrorResponse {
                message: "The query string could not be read.".to_owned(),
                errors: None,
                error: Some(self.parse_problem),
            }),
        )
            .into_response()
    }
}

/// Wrapper for [axum::extract::Path] so ids which aren't numbers get our data structure
/// for API errors instead of a plain text body
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(PathErrorResponse))]
pub struct Path<T>(pub T);

/// Response type representing unreadable path parameters
pub struct PathErrorResponse {
    status: StatusCode,
    parse_problem: String,
}

impl From<PathRejection> for PathErrorResponse {
    fn from(value: PathRejection) -> Self {
        PathErrorResponse {
            status: value.status(),
            parse_problem: value.body_text(),
        }
    }
}

impl IntoResponse for PathErrorResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            axum::Json(BasicErrorResponse {
                message: "The requested path could not be read.".to_owned(),
                errors: None,
                error: Some(self.parse_problem),
            }),
        )
            .into_response()
    }
}
