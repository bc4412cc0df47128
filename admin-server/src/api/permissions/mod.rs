//! Permission API Module

pub mod handler;

use axum::{Router, routing::delete, routing::get, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/permission/list", get(handler::list))
        .route("/permission/get", get(handler::get_by_id))
        .route("/permission/create", post(handler::create))
        .route("/permission/update", post(handler::update))
        .route("/permission/delete", delete(handler::delete))
}
