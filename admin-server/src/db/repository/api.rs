//! Api Catalog Repository
//!
//! 维护后端可寻址操作目录；`refresh` 用路由表做一次对账
//! (新增缺失、更新变化、清除失效)。

use super::{RepoError, RepoResult};
use crate::db::query::{self, Direction, Filter};
use shared::models::{Api, ApiCreate, ApiUpdate, MethodType};
use sqlx::SqlitePool;

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Api>> {
    let api = sqlx::query_as::<_, Api>("SELECT * FROM api WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(api)
}

pub async fn find_by_path_method(
    pool: &SqlitePool,
    path: &str,
    method: MethodType,
) -> RepoResult<Option<Api>> {
    let api = sqlx::query_as::<_, Api>("SELECT * FROM api WHERE path = ? AND method = ? LIMIT 1")
        .bind(path)
        .bind(method)
        .fetch_optional(pool)
        .await?;
    Ok(api)
}

/// 分页列出目录项，可按 path/tags 模糊过滤
pub async fn list(
    pool: &SqlitePool,
    path: Option<&str>,
    tags: Option<&str>,
    page: i64,
    page_size: i64,
) -> RepoResult<(i64, Vec<Api>)> {
    let mut conditions = Vec::new();
    if let Some(path) = path
        && !path.is_empty()
    {
        conditions.push(Filter::Contains("path", path.to_string()));
    }
    if let Some(tags) = tags
        && !tags.is_empty()
    {
        conditions.push(Filter::Contains("tags", tags.to_string()));
    }
    let filter = Filter::and(conditions);
    query::list(
        pool,
        "api",
        &filter,
        &[("path", Direction::Asc)],
        page,
        page_size,
    )
    .await
}

pub async fn create(pool: &SqlitePool, data: ApiCreate) -> RepoResult<Api> {
    if find_by_path_method(pool, &data.path, data.method).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Api {} {} already exists",
            data.method.as_str(),
            data.path
        )));
    }

    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO api (id, path, method, summary, tags, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&data.path)
    .bind(data.method)
    .bind(&data.summary)
    .bind(&data.tags)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create api".into()))
}

/// Returns `Ok(None)` when the id does not exist (no-op signal).
pub async fn update(pool: &SqlitePool, id: i64, data: ApiUpdate) -> RepoResult<Option<Api>> {
    if find_by_id(pool, id).await?.is_none() {
        return Ok(None);
    }

    let now = shared::util::now_millis();
    sqlx::query(
        "UPDATE api SET path = COALESCE(?1, path), method = COALESCE(?2, method), \
         summary = COALESCE(?3, summary), tags = COALESCE(?4, tags), updated_at = ?5 WHERE id = ?6",
    )
    .bind(&data.path)
    .bind(data.method)
    .bind(&data.summary)
    .bind(&data.tags)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    find_by_id(pool, id).await
}

/// Returns `Ok(false)` when the id does not exist.
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM api WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Refresh 结果：新增 / 更新 / 清除 条数
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RefreshSummary {
    pub added: u64,
    pub updated: u64,
    pub removed: u64,
}

/// 用实际路由表对账 Api 目录（一个事务）
pub async fn refresh(pool: &SqlitePool, catalog: &[ApiCreate]) -> RepoResult<RefreshSummary> {
    let now = shared::util::now_millis();
    let mut summary = RefreshSummary {
        added: 0,
        updated: 0,
        removed: 0,
    };

    let existing = sqlx::query_as::<_, Api>("SELECT * FROM api")
        .fetch_all(pool)
        .await?;

    let mut tx = pool.begin().await?;

    for item in catalog {
        match existing
            .iter()
            .find(|a| a.path == item.path && a.method == item.method)
        {
            None => {
                sqlx::query(
                    "INSERT INTO api (id, path, method, summary, tags, created_at, updated_at) \
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(shared::util::snowflake_id())
                .bind(&item.path)
                .bind(item.method)
                .bind(&item.summary)
                .bind(&item.tags)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                summary.added += 1;
            }
            Some(api) if api.summary != item.summary || api.tags != item.tags => {
                sqlx::query("UPDATE api SET summary = ?, tags = ?, updated_at = ? WHERE id = ?")
                    .bind(&item.summary)
                    .bind(&item.tags)
                    .bind(now)
                    .bind(api.id)
                    .execute(&mut *tx)
                    .await?;
                summary.updated += 1;
            }
            Some(_) => {}
        }
    }

    // 路由表里已不存在的目录项清除
    for api in &existing {
        let still_routed = catalog
            .iter()
            .any(|c| c.path == api.path && c.method == api.method);
        if !still_routed {
            sqlx::query("DELETE FROM api WHERE id = ?")
                .bind(api.id)
                .execute(&mut *tx)
                .await?;
            summary.removed += 1;
        }
    }

    tx.commit().await?;
    Ok(summary)
}
