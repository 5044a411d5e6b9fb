use super::user_models::IdentityRecord;
use anyhow::Result;

pub trait CredentialStore: Send + Sync {
    /// Returns the identity registered under `email`.
    /// Returns Ok(None) if the email is unknown.
    /// Returns Err if there is a database error.
    fn get_identity(&self, email: &str) -> Result<Option<IdentityRecord>>;

    /// Stores `record` unless its email is already registered, atomically.
    /// Returns Ok(false), leaving the existing row untouched, if it was.
    fn insert_identity_if_absent(&self, record: &IdentityRecord) -> Result<bool>;
}
