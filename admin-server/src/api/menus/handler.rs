//! Menu API Handlers

use axum::Json;
use axum::extract::{Extension, Query, State};
use serde::Deserialize;

use crate::api::IdQuery;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::menu;
use crate::utils::{AppError, AppResult};
use shared::PaginatedResponse;
use shared::models::{Menu, MenuCreate, MenuUpdate};

#[derive(Debug, Deserialize)]
pub struct MenuListQuery {
    #[serde(default = "crate::api::default_page")]
    pub page: i64,
    #[serde(default = "crate::api::default_page_size")]
    pub page_size: i64,
    pub name: Option<String>,
}

/// GET /api/v1/menu/list - 分页查询菜单
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<MenuListQuery>,
) -> AppResult<Json<PaginatedResponse<Menu>>> {
    let (total, items) = menu::list(
        &state.pool,
        query.name.as_deref(),
        query.page,
        query.page_size,
    )
    .await?;
    Ok(Json(PaginatedResponse::new(
        items,
        total,
        query.page,
        query.page_size,
    )))
}

/// POST /api/v1/menu/create - 创建菜单
pub async fn create(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<MenuCreate>,
) -> AppResult<Json<Menu>> {
    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        menu_name = %payload.name,
        "Creating menu"
    );

    let m = menu::create(&state.pool, payload).await?;
    Ok(Json(m))
}

/// POST /api/v1/menu/update 的请求体 (id + 变更字段)
#[derive(Debug, Deserialize)]
pub struct MenuUpdatePayload {
    pub id: i64,
    #[serde(flatten)]
    pub data: MenuUpdate,
}

/// POST /api/v1/menu/update - 更新菜单
pub async fn update(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<MenuUpdatePayload>,
) -> AppResult<Json<Menu>> {
    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        menu_id = payload.id,
        "Updating menu"
    );

    let m = menu::update(&state.pool, payload.id, payload.data)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Menu {} not found", payload.id)))?;
    Ok(Json(m))
}

/// DELETE /api/v1/menu/delete - 删除菜单
pub async fn delete(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<IdQuery>,
) -> AppResult<Json<bool>> {
    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        menu_id = query.id,
        "Deleting menu"
    );

    let deleted = menu::delete(&state.pool, query.id).await?;
    if !deleted {
        return Err(AppError::not_found(format!("Menu {} not found", query.id)));
    }
    Ok(Json(true))
}
