pub mod auth;
mod sqlite_user_store;
mod user_manager;
pub mod user_models;
mod user_store;

pub use auth::CredentialHasher;
pub use sqlite_user_store::{SqliteUserStore, LOGIN_TABLE_NAME, USER_VERSIONED_SCHEMAS};
pub use user_manager::UserManager;
pub use user_models::{Identity, IdentityRecord};
pub use user_store::CredentialStore;
