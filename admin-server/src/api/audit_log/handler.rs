//! Audit Log API Handlers

use std::collections::{BTreeMap, HashMap};

use axum::Json;
use axum::extract::{Extension, Query, State};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::audit_log;
use crate::utils::time;
use crate::utils::AppResult;
use shared::PaginatedResponse;
use shared::models::{AuditLog, AuditLogBatchDelete};

/// GET /api/v1/auditlog/list - 日期范围 + 复合条件分页查询
///
/// 已知键：`page`, `page_size`, `start_time`, `end_time` (YYYY-MM-DD)；
/// 其余键按列名过滤，未知列直接报错 (400)。
pub async fn list(
    State(state): State<ServerState>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<PaginatedResponse<AuditLog>>> {
    let mut params = params;
    let page = params
        .remove("page")
        .and_then(|v| v.parse().ok())
        .unwrap_or(1);
    let page_size = params
        .remove("page_size")
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);

    let start = match params.remove("start_time").filter(|v| !v.is_empty()) {
        Some(v) => time::day_start_millis(time::parse_date(&v)?),
        None => 0,
    };
    let end = match params.remove("end_time").filter(|v| !v.is_empty()) {
        Some(v) => time::day_end_millis(time::parse_date(&v)?),
        None => shared::util::now_millis(),
    };

    let filter = audit_log::build_filters(&params)?;
    let (total, items) =
        audit_log::list_by_date_range(&state.pool, start, end, filter, page, page_size).await?;

    Ok(Json(PaginatedResponse::new(items, total, page, page_size)))
}

#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_days() -> u32 {
    7
}

/// GET /api/v1/auditlog/statistics - 最近 N 天每日条数
pub async fn statistics(
    State(state): State<ServerState>,
    Query(query): Query<StatisticsQuery>,
) -> AppResult<Json<BTreeMap<String, i64>>> {
    let stats = audit_log::statistics(&state.pool, query.days).await?;
    Ok(Json(stats))
}

/// DELETE /api/v1/auditlog/batch_delete - 批量软删除
pub async fn batch_delete(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<AuditLogBatchDelete>,
) -> AppResult<Json<u64>> {
    tracing::info!(
        user_id = current_user.id,
        username = %current_user.username,
        count = payload.ids.len(),
        "Batch soft-deleting audit logs"
    );

    let affected = audit_log::batch_soft_delete(&state.pool, &payload.ids).await?;
    Ok(Json(affected))
}
