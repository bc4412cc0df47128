//! User API Handlers

use axum::Json;
use axum::extract::{Extension, Query, State};
use serde::Deserialize;
use validator::Validate;

use crate::api::IdQuery;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::user;
use crate::utils::{AppError, AppResult};
use shared::PaginatedResponse;
use shared::models::{PasswordReset, User, UserCreate, UserResponse, UserUpdate};

/// 管理员重置口令的默认值
const DEFAULT_RESET_PASSWORD: &str = "123456";

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    #[serde(default = "crate::api::default_page")]
    pub page: i64,
    #[serde(default = "crate::api::default_page_size")]
    pub page_size: i64,
    pub username: Option<String>,
    pub email: Option<String>,
    pub dept_id: Option<i64>,
}

async fn to_response(state: &ServerState, user_row: User) -> AppResult<UserResponse> {
    let role_ids = user::role_ids_of(&state.pool, user_row.id).await?;
    Ok(UserResponse::from_user(user_row, role_ids))
}

/// GET /api/v1/user/list - 分页查询用户
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<PaginatedResponse<UserResponse>>> {
    let (total, users) = user::list(
        &state.pool,
        query.username.as_deref(),
        query.email.as_deref(),
        query.dept_id,
        query.page,
        query.page_size,
    )
    .await?;

    let mut data = Vec::with_capacity(users.len());
    for u in users {
        data.push(to_response(&state, u).await?);
    }
    Ok(Json(PaginatedResponse::new(
        data,
        total,
        query.page,
        query.page_size,
    )))
}

/// GET /api/v1/user/get - 按 ID 查询
pub async fn get_by_id(
    State(state): State<ServerState>,
    Query(query): Query<IdQuery>,
) -> AppResult<Json<UserResponse>> {
    let user_row = user::find_by_id(&state.pool, query.id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {} not found", query.id)))?;
    Ok(Json(to_response(&state, user_row).await?))
}

/// POST /api/v1/user/create - 创建用户
pub async fn create(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<UserCreate>,
) -> AppResult<Json<UserResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        new_user = %payload.username,
        "Creating user"
    );

    let user_row = user::create(&state.pool, payload).await?;
    Ok(Json(to_response(&state, user_row).await?))
}

/// POST /api/v1/user/update 的请求体 (id + 变更字段)
#[derive(Debug, Deserialize)]
pub struct UserUpdatePayload {
    pub id: i64,
    #[serde(flatten)]
    pub data: UserUpdate,
}

/// POST /api/v1/user/update - 更新用户
pub async fn update(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<UserUpdatePayload>,
) -> AppResult<Json<UserResponse>> {
    payload
        .data
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        target_id = payload.id,
        "Updating user"
    );

    let user_row = user::update(&state.pool, payload.id, payload.data)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {} not found", payload.id)))?;
    Ok(Json(to_response(&state, user_row).await?))
}

/// DELETE /api/v1/user/delete - 删除用户
pub async fn delete(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<IdQuery>,
) -> AppResult<Json<bool>> {
    if query.id == current_user.id {
        return Err(AppError::validation("Cannot delete yourself"));
    }

    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        target_id = query.id,
        "Deleting user"
    );

    let deleted = user::delete(&state.pool, query.id).await?;
    if !deleted {
        return Err(AppError::not_found(format!("User {} not found", query.id)));
    }
    Ok(Json(true))
}

/// POST /api/v1/user/reset_password - 管理员重置口令为默认值
pub async fn reset_password(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<PasswordReset>,
) -> AppResult<Json<bool>> {
    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        target_id = payload.user_id,
        "Resetting user password"
    );

    let updated =
        user::update_password(&state.pool, payload.user_id, DEFAULT_RESET_PASSWORD).await?;
    if !updated {
        return Err(AppError::not_found(format!(
            "User {} not found",
            payload.user_id
        )));
    }
    Ok(Json(true))
}
