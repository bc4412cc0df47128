//! User API Module

pub mod handler;

use axum::{Router, routing::delete, routing::get, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/user/list", get(handler::list))
        .route("/user/get", get(handler::get_by_id))
        .route("/user/create", post(handler::create))
        .route("/user/update", post(handler::update))
        .route("/user/delete", delete(handler::delete))
        .route("/user/reset_password", post(handler::reset_password))
}
