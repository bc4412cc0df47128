//! Base API Module (登录与当前用户)

pub mod handler;

use axum::{Router, routing::get, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/base/access_token", post(handler::login))
        .route("/base/userinfo", get(handler::userinfo))
        .route("/base/usermenu", get(handler::usermenu))
        .route("/base/userapi", get(handler::userapi))
        .route("/base/update_password", post(handler::update_password))
}
