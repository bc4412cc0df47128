//! Data models
//!
//! Shared between admin-server and frontend (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY), all timestamps Unix millis.

pub mod api;
pub mod audit_log;
pub mod dept;
pub mod menu;
pub mod permission;
pub mod role;
pub mod user;

// Re-exports
pub use api::*;
pub use audit_log::*;
pub use dept::*;
pub use menu::*;
pub use permission::*;
pub use role::*;
pub use user::*;
