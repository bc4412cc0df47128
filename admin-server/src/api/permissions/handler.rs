//! Permission API Handlers

use axum::Json;
use axum::extract::{Extension, Query, State};
use serde::Deserialize;

use crate::api::IdQuery;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::permission;
use crate::utils::{AppError, AppResult};
use shared::PaginatedResponse;
use shared::models::{Permission, PermissionCreate, PermissionType, PermissionUpdate};

#[derive(Debug, Deserialize)]
pub struct PermissionListQuery {
    #[serde(default = "crate::api::default_page")]
    pub page: i64,
    #[serde(default = "crate::api::default_page_size")]
    pub page_size: i64,
    pub name: Option<String>,
    pub permission_type: Option<PermissionType>,
    pub parent_id: Option<i64>,
}

/// GET /api/v1/permission/list - 分页查询权限
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<PermissionListQuery>,
) -> AppResult<Json<PaginatedResponse<Permission>>> {
    let (total, items) = permission::list(
        &state.pool,
        query.name.as_deref(),
        query.permission_type,
        query.parent_id,
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

/// GET /api/v1/permission/get - 按 ID 查询
pub async fn get_by_id(
    State(state): State<ServerState>,
    Query(query): Query<IdQuery>,
) -> AppResult<Json<Permission>> {
    let p = permission::find_by_id(&state.pool, query.id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Permission {} not found", query.id)))?;
    Ok(Json(p))
}

/// POST /api/v1/permission/create - 创建权限 (code 缺省时自动生成)
pub async fn create(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<PermissionCreate>,
) -> AppResult<Json<Permission>> {
    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        permission_name = %payload.name,
        "Creating permission"
    );

    let p = permission::create(&state.pool, payload).await?;
    Ok(Json(p))
}

/// POST /api/v1/permission/update 的请求体 (id + 变更字段)
#[derive(Debug, Deserialize)]
pub struct PermissionUpdatePayload {
    pub id: i64,
    #[serde(flatten)]
    pub data: PermissionUpdate,
}

/// POST /api/v1/permission/update - 更新权限
pub async fn update(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<PermissionUpdatePayload>,
) -> AppResult<Json<Permission>> {
    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        permission_id = payload.id,
        "Updating permission"
    );

    let p = permission::update(&state.pool, payload.id, payload.data)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Permission {} not found", payload.id)))?;
    Ok(Json(p))
}

/// DELETE /api/v1/permission/delete - 删除权限
pub async fn delete(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<IdQuery>,
) -> AppResult<Json<bool>> {
    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        permission_id = query.id,
        "Deleting permission"
    );

    let deleted = permission::delete(&state.pool, query.id).await?;
    if !deleted {
        return Err(AppError::not_found(format!(
            "Permission {} not found",
            query.id
        )));
    }
    Ok(Json(true))
}
