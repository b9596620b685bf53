use thiserror::Error;

use crate::models::Role;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum SleepError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("{role} accounts may not {action}")]
    Forbidden { role: Role, action: &'static str },

    #[error("an account with email {0} already exists")]
    DuplicateEmail(String),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("storage dependency failed")]
    Dependency(#[source] BoxError),
}

impl SleepError {
    pub fn dependency<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        SleepError::Dependency(err.into())
    }
}

impl From<sqlx::Error> for SleepError {
    fn from(err: sqlx::Error) -> Self {
        SleepError::dependency(err)
    }
}

/// Reasons an ingestion or registration payload is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("sleep quality is required")]
    MissingQuality,

    #[error("unknown sleep quality '{0}'")]
    UnknownQuality(String),

    #[error("date is required")]
    MissingDate,

    #[error("'{0}' is not a YYYY-MM-DD date")]
    InvalidDate(String),

    #[error("either hours or both sleep start and end are required")]
    MissingDuration,

    #[error("hours must be a non-negative number, got {0}")]
    InvalidHours(f64),

    #[error("'{0}' is not an HH:MM time")]
    InvalidTime(String),

    #[error("{0} is required")]
    MissingField(&'static str),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingQuality => "missing_quality",
            ValidationError::UnknownQuality(_) => "unknown_quality",
            ValidationError::MissingDate => "missing_date",
            ValidationError::InvalidDate(_) => "invalid_date",
            ValidationError::MissingDuration => "missing_duration",
            ValidationError::InvalidHours(_) => "invalid_hours",
            ValidationError::InvalidTime(_) => "invalid_time",
            ValidationError::MissingField(_) => "missing_field",
        }
    }
}
