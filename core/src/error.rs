//! Storage error types.
//!
//! A missing record is never an error: lookups return `Option` and deletes
//! return `bool`. `StoreError` covers the failures a caller must handle
//! differently from "not found".

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying medium could not complete the operation.
    #[error("storage unavailable: {0:#}")]
    Unavailable(#[source] anyhow::Error),

    /// A workout, measurement, or goal referenced a user that does not exist.
    #[error("user {0} does not exist")]
    UnknownUser(i64),

    /// Another user already has this username.
    #[error("username '{0}' is already taken")]
    DuplicateUsername(String),

    /// A date, deadline, or creation time falls outside years 0000 to 9999.
    #[error("date {0} is outside the supported range (years 0000 to 9999)")]
    InstantOutOfRange(DateTime<Utc>),
}

impl StoreError {
    /// Returns `true` if the failure came from the medium rather than the input.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Unavailable(err.into())
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
