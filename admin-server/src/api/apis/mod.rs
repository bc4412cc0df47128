//! Api Catalog API Module

pub mod handler;

use axum::{Router, routing::delete, routing::get, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/list", get(handler::list))
        .route("/api/create", post(handler::create))
        .route("/api/update", post(handler::update))
        .route("/api/delete", delete(handler::delete))
        .route("/api/refresh", post(handler::refresh))
}
