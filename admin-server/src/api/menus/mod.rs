//! Menu API Module

pub mod handler;

use axum::{Router, routing::delete, routing::get, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/menu/list", get(handler::list))
        .route("/menu/create", post(handler::create))
        .route("/menu/update", post(handler::update))
        .route("/menu/delete", delete(handler::delete))
}
