//! Audit Log API Module

pub mod handler;

use axum::{Router, routing::delete, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/auditlog/list", get(handler::list))
        .route("/auditlog/statistics", get(handler::statistics))
        .route("/auditlog/batch_delete", delete(handler::batch_delete))
}
