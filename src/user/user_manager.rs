use super::auth::CredentialHasher;
use super::user_models::{Identity, IdentityRecord};
use super::user_store::CredentialStore;
use crate::error::{AuthError, CoreResult, ValidationError};
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

/// Registers and authenticates identities on top of a [`CredentialStore`].
pub struct UserManager {
    user_store: Arc<dyn CredentialStore>,
    hasher: CredentialHasher,
    /// Verified against when the email is unknown.
    dummy_hash: String,
}

fn require_non_empty(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

impl UserManager {
    pub fn new(user_store: Arc<dyn CredentialStore>, hasher: CredentialHasher) -> CoreResult<Self> {
        let dummy_hash = hasher
            .hash("pezzottify-dummy-password")
            .context("Failed to prepare credential hasher")?;
        Ok(Self {
            user_store,
            hasher,
            dummy_hash,
        })
    }

    pub fn register(&self, email: &str, username: &str, password: &str) -> CoreResult<Identity> {
        require_non_empty(email, "email")?;
        require_non_empty(username, "username")?;
        require_non_empty(password, "password")?;

        let record = IdentityRecord {
            email: email.to_string(),
            username: username.to_string(),
            password_hash: self.hasher.hash(password)?,
            hasher: self.hasher,
        };

        if !self.user_store.insert_identity_if_absent(&record)? {
            warn!("Registration refused, {} is already registered", email);
            return Err(AuthError::AlreadyExists.into());
        }
        info!("Registered {} as {}", email, username);
        Ok(record.identity())
    }

    pub fn authenticate(&self, email: &str, password: &str) -> CoreResult<Identity> {
        let record = match self.user_store.get_identity(email)? {
            Some(record) => record,
            None => {
                // Same cost as a real check, the outcome is thrown away.
                let _ = self.hasher.verify(password, &self.dummy_hash);
                warn!("Login failed for {}", email);
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if !record.hasher.verify(password, &record.password_hash)? {
            warn!("Login failed for {}", email);
            return Err(AuthError::InvalidCredentials.into());
        }
        Ok(record.identity())
    }
}
