use super::auth::CredentialHasher;
use serde::{Deserialize, Serialize};

/// An authenticated user. Owner-scoped calls take it as their request context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub username: String,
}

/// A `login` row.
#[derive(Clone, Debug)]
pub struct IdentityRecord {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub hasher: CredentialHasher,
}

impl IdentityRecord {
    pub fn identity(&self) -> Identity {
        Identity {
            email: self.email.clone(),
            username: self.username.clone(),
        }
    }
}
