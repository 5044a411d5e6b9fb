//! Error taxonomy of the subscription core.
//!
//! Validation, auth, not-found and conflict errors are expected outcomes that
//! callers render to the user. `Storage` wraps everything the backend throws at
//! us and is the only kind worth retrying.

use thiserror::Error;

pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please provide at least one search criteria.")]
    EmptyQuery,

    #[error("Year must be a whole number, got '{0}'.")]
    InvalidYear(String),

    #[error("The {0} cannot be empty.")]
    EmptyField(&'static str),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Email already exists")]
    AlreadyExists,

    /// Returned for both unknown emails and wrong passwords.
    #[error("Invalid email or password")]
    InvalidCredentials,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("No music found with title '{title}' by '{artist}'.")]
    NotFound { title: String, artist: String },

    #[error("You have already subscribed to this music.")]
    Conflict { owner: String, music_id: String },

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl CoreError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Storage(_))
    }
}
