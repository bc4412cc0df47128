//! Department API Handlers

use axum::Json;
use axum::extract::{Extension, Query, State};
use serde::Deserialize;

use crate::api::IdQuery;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::dept;
use crate::utils::{AppError, AppResult};
use shared::PaginatedResponse;
use shared::models::{Dept, DeptCreate, DeptUpdate};

#[derive(Debug, Deserialize)]
pub struct DeptListQuery {
    #[serde(default = "crate::api::default_page")]
    pub page: i64,
    #[serde(default = "crate::api::default_page_size")]
    pub page_size: i64,
    pub name: Option<String>,
}

/// GET /api/v1/dept/list - 分页查询部门
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<DeptListQuery>,
) -> AppResult<Json<PaginatedResponse<Dept>>> {
    let (total, items) = dept::list(
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

/// GET /api/v1/dept/get - 按 ID 查询
pub async fn get_by_id(
    State(state): State<ServerState>,
    Query(query): Query<IdQuery>,
) -> AppResult<Json<Dept>> {
    let d = dept::find_by_id(&state.pool, query.id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Department {} not found", query.id)))?;
    Ok(Json(d))
}

/// POST /api/v1/dept/create - 创建部门 (同步扩展闭包表)
pub async fn create(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<DeptCreate>,
) -> AppResult<Json<Dept>> {
    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        dept_name = %payload.name,
        parent_id = payload.parent_id,
        "Creating department"
    );

    let d = dept::create(&state.pool, payload).await?;
    Ok(Json(d))
}

/// POST /api/v1/dept/update 的请求体 (id + 变更字段)
#[derive(Debug, Deserialize)]
pub struct DeptUpdatePayload {
    pub id: i64,
    #[serde(flatten)]
    pub data: DeptUpdate,
}

/// POST /api/v1/dept/update - 更新部门 (parent_id 变化触发整子树迁移)
pub async fn update(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<DeptUpdatePayload>,
) -> AppResult<Json<Dept>> {
    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        dept_id = payload.id,
        "Updating department"
    );

    let d = dept::update(&state.pool, payload.id, payload.data)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Department {} not found", payload.id)))?;
    Ok(Json(d))
}

/// DELETE /api/v1/dept/delete - 删除部门 (仅叶子)
pub async fn delete(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<IdQuery>,
) -> AppResult<Json<bool>> {
    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        dept_id = query.id,
        "Deleting department"
    );

    let deleted = dept::delete(&state.pool, query.id).await?;
    if !deleted {
        return Err(AppError::not_found(format!(
            "Department {} not found",
            query.id
        )));
    }
    Ok(Json(true))
}
