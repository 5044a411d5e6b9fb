//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::TestEnv;
//!
//! #[test]
//! fn test_register() {
//!     let env = TestEnv::with_catalog();
//!     env.service.register("a@x.com", "alice", "pw1").unwrap();
//! }
//! ```

mod constants;
mod fixtures;

pub use constants::*;
pub use fixtures::TestEnv;
