//! Role API Module

pub mod handler;

use axum::{Router, routing::delete, routing::get, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/role/list", get(handler::list))
        .route("/role/create", post(handler::create))
        .route("/role/update", post(handler::update))
        .route("/role/delete", delete(handler::delete))
        .route(
            "/role/authorized",
            get(handler::get_authorized).post(handler::set_authorized),
        )
}
