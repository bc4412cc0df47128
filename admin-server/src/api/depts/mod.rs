//! Department API Module

pub mod handler;

use axum::{Router, routing::delete, routing::get, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/dept/list", get(handler::list))
        .route("/dept/get", get(handler::get_by_id))
        .route("/dept/create", post(handler::create))
        .route("/dept/update", post(handler::update))
        .route("/dept/delete", delete(handler::delete))
}
