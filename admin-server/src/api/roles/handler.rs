//! Role API Handlers

use axum::Json;
use axum::extract::{Extension, Query, State};
use serde::Deserialize;

use crate::api::IdQuery;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::role;
use crate::utils::{AppError, AppResult};
use shared::PaginatedResponse;
use shared::models::{Permission, Role, RoleAuthorize, RoleCreate, RoleUpdate};

#[derive(Debug, Deserialize)]
pub struct RoleListQuery {
    #[serde(default = "crate::api::default_page")]
    pub page: i64,
    #[serde(default = "crate::api::default_page_size")]
    pub page_size: i64,
    pub name: Option<String>,
}

/// GET /api/v1/role/list - 分页查询角色
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<RoleListQuery>,
) -> AppResult<Json<PaginatedResponse<Role>>> {
    let (total, items) = role::list(
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

/// POST /api/v1/role/create - 创建角色
pub async fn create(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<RoleCreate>,
) -> AppResult<Json<Role>> {
    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        role_name = %payload.name,
        "Creating role"
    );

    let role = role::create(&state.pool, payload).await?;
    Ok(Json(role))
}

/// POST /api/v1/role/update 的请求体 (id + 变更字段)
#[derive(Debug, Deserialize)]
pub struct RoleUpdatePayload {
    pub id: i64,
    #[serde(flatten)]
    pub data: RoleUpdate,
}

/// POST /api/v1/role/update - 更新角色
pub async fn update(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<RoleUpdatePayload>,
) -> AppResult<Json<Role>> {
    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        role_id = payload.id,
        "Updating role"
    );

    let role = role::update(&state.pool, payload.id, payload.data)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Role {} not found", payload.id)))?;
    Ok(Json(role))
}

/// DELETE /api/v1/role/delete - 删除角色
pub async fn delete(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<IdQuery>,
) -> AppResult<Json<bool>> {
    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        role_id = query.id,
        "Deleting role"
    );

    let deleted = role::delete(&state.pool, query.id).await?;
    if !deleted {
        return Err(AppError::not_found(format!("Role {} not found", query.id)));
    }
    Ok(Json(true))
}

/// GET /api/v1/role/authorized - 查询角色已授权的权限
pub async fn get_authorized(
    State(state): State<ServerState>,
    Query(query): Query<IdQuery>,
) -> AppResult<Json<Vec<Permission>>> {
    role::find_by_id(&state.pool, query.id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Role {} not found", query.id)))?;
    let permissions = role::permissions_of(&state.pool, query.id).await?;
    Ok(Json(permissions))
}

/// POST /api/v1/role/authorized - 整体替换角色的权限集合
pub async fn set_authorized(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<RoleAuthorize>,
) -> AppResult<Json<bool>> {
    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        role_id = payload.id,
        permission_count = payload.permission_ids.len(),
        "Updating role permissions"
    );

    let updated = role::authorize(&state.pool, payload.id, &payload.permission_ids).await?;
    if !updated {
        return Err(AppError::not_found(format!("Role {} not found", payload.id)));
    }
    Ok(Json(true))
}
