//! Repository Module
//!
//! CRUD operations over SQLite tables. Free functions over `&SqlitePool`;
//! every multi-row maintenance path (closure table, role grants, batch
//! soft-delete) runs inside a transaction and commits as one unit.

pub mod api;
pub mod audit_log;
pub mod dept;
pub mod menu;
pub mod permission;
pub mod role;
pub mod user;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Business rule violation: {0}")]
    Business(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return RepoError::Duplicate(db_err.message().to_string());
        }
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
