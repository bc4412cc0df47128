//! Shared types for the admin backend
//!
//! Entity models, create/update payloads and pure helpers used by the
//! server and by API clients. DB row types derive `sqlx::FromRow` behind
//! the `db` feature so clients can depend on this crate without pulling
//! in a database driver.

pub mod models;
pub mod pagination;
pub mod util;

// Re-exports
pub use pagination::PaginatedResponse;
pub use serde::{Deserialize, Serialize};
