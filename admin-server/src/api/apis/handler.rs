//! Api Catalog Handlers

use axum::Json;
use axum::extract::{Extension, Query, State};
use serde::Deserialize;

use crate::api::IdQuery;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::api::{self, RefreshSummary};
use crate::routes;
use crate::utils::{AppError, AppResult};
use shared::PaginatedResponse;
use shared::models::{Api, ApiCreate, ApiUpdate};

#[derive(Debug, Deserialize)]
pub struct ApiListQuery {
    #[serde(default = "crate::api::default_page")]
    pub page: i64,
    #[serde(default = "crate::api::default_page_size")]
    pub page_size: i64,
    pub path: Option<String>,
    pub tags: Option<String>,
}

/// GET /api/v1/api/list - 分页查询目录
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ApiListQuery>,
) -> AppResult<Json<PaginatedResponse<Api>>> {
    let (total, items) = api::list(
        &state.pool,
        query.path.as_deref(),
        query.tags.as_deref(),
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

/// POST /api/v1/api/create - 手工登记目录项
pub async fn create(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<ApiCreate>,
) -> AppResult<Json<Api>> {
    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        api_path = %payload.path,
        "Creating api entry"
    );

    let a = api::create(&state.pool, payload).await?;
    Ok(Json(a))
}

/// POST /api/v1/api/update 的请求体 (id + 变更字段)
#[derive(Debug, Deserialize)]
pub struct ApiUpdatePayload {
    pub id: i64,
    #[serde(flatten)]
    pub data: ApiUpdate,
}

/// POST /api/v1/api/update - 更新目录项
pub async fn update(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<ApiUpdatePayload>,
) -> AppResult<Json<Api>> {
    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        api_id = payload.id,
        "Updating api entry"
    );

    let a = api::update(&state.pool, payload.id, payload.data)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Api {} not found", payload.id)))?;
    Ok(Json(a))
}

/// DELETE /api/v1/api/delete - 删除目录项
pub async fn delete(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<IdQuery>,
) -> AppResult<Json<bool>> {
    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        api_id = query.id,
        "Deleting api entry"
    );

    let deleted = api::delete(&state.pool, query.id).await?;
    if !deleted {
        return Err(AppError::not_found(format!("Api {} not found", query.id)));
    }
    Ok(Json(true))
}

/// POST /api/v1/api/refresh - 用实际路由表对账目录
pub async fn refresh(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<RefreshSummary>> {
    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        "Refreshing api catalog from route table"
    );

    let summary = api::refresh(&state.pool, &routes::route_catalog()).await?;
    tracing::info!(
        added = summary.added,
        updated = summary.updated,
        removed = summary.removed,
        "Api catalog refreshed"
    );
    Ok(Json(summary))
}
