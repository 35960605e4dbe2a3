use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive, Zero};
use std::borrow::Cow;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

pub mod dashboard;
pub mod project;
pub mod risk_issue;
pub mod task;
pub mod time_entry;
pub mod user;

#[cfg(test)]
pub(crate) mod test_util;

/// Returned when a string doesn't name any variant of one of the domain's enumerations
#[derive(Error, Debug, PartialEq, Eq)]
#[error("\"{0}\" is not one of the accepted values")]
pub struct UnrecognizedValue(pub String);

/// Direction of an ordering applied to a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl std::str::FromStr for SortDirection {
    type Err = UnrecognizedValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Ascending),
            "desc" => Ok(Self::Descending),
            _ => Err(UnrecognizedValue(value.to_owned())),
        }
    }
}

/// Builds a validation failure for a single field. Used for checks which can only be
/// done with access to stored data, such as verifying a referenced record exists.
pub(crate) fn field_error(
    field: &'static str,
    code: &'static str,
    message: impl Into<Cow<'static, str>>,
) -> ValidationErrors {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());

    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    errors
}

/// Returns the requested value of a partial update only if it differs from what's stored
pub(crate) fn changed<T: PartialEq + Clone>(requested: &Option<T>, current: &T) -> Option<T> {
    match requested {
        Some(value) if value != current => Some(value.clone()),
        _ => None,
    }
}

/// [part] as a percentage of [whole], worked out in decimal and rounded half up to [places]
/// decimals. Zero when [whole] is zero.
pub(crate) fn percentage(part: &BigDecimal, whole: &BigDecimal, places: i64) -> f64 {
    if whole.is_zero() {
        return 0.0;
    }

    (part * BigDecimal::from(100) / whole)
        .with_scale_round(places, RoundingMode::HalfUp)
        .to_f64()
        .unwrap_or(0.0)
}
