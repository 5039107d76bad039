//! # Taskboard Shared Library
//!
//! Domain types and database operations used by the Taskboard API server.
//!
//! ## Module Organization
//!
//! - `roles`: account roles, task roles and the role catalog
//! - `models`: task and user rows with their CRUD operations
//! - `assignment`: owner/reviewer reconciliation and unassignment
//! - `query`: joined read models for tasks and users
//! - `notifications`: user notifications and their message format
//! - `permissions`: per-field view/edit permissions
//! - `auth`: password hashing and the request session context
//! - `db`: connection pool, migrations and bootstrap data
//! - `error`: the `ServiceError` type returned by every operation

pub mod assignment;
pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod notifications;
pub mod permissions;
pub mod query;
pub mod roles;

pub use error::{ServiceError, ServiceResult};

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
