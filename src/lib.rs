//! Pezzottify Subscriptions Library
//!
//! Credentials, catalog search and per-user music subscriptions on top of
//! SQLite. The binary is a thin REPL over [`service::MusicService`].

pub mod catalog;
pub mod config;
pub mod error;
pub mod image;
pub mod service;
pub mod sqlite_persistence;
pub mod subscription;
pub mod user;

pub use error::{AuthError, CoreError, CoreResult, ValidationError};
pub use service::{MusicService, QueryOutcome};
pub use user::Identity;
