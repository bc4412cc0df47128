//! Audit Log Repository
//!
//! Append 路径 + 复合过滤查询 + 按天统计 + 批量软删除。
//! 除软删除外日志行永不修改。

use std::collections::{BTreeMap, HashMap};

use super::{RepoError, RepoResult};
use crate::db::query::{self, Direction, Filter, SqlValue};
use crate::utils::time::day_bounds_millis;
use shared::models::{AuditLog, AuditLogCreate};
use sqlx::SqlitePool;

/// 子串匹配的过滤键（字符串列）
const CONTAINS_FIELDS: &[&str] = &[
    "username",
    "module",
    "summary",
    "method",
    "path",
    "ip_address",
    "user_agent",
    "operation_type",
    "log_level",
];

/// 精确匹配的过滤键（数值列）
const EXACT_FIELDS: &[&str] = &["status", "user_id", "response_time"];

/// 把查询参数转为复合过滤条件
///
/// - 字符串字段 → 大小写不敏感子串匹配
/// - status / user_id / response_time → 精确匹配（值必须是整数）
/// - 空值忽略（不会变成"匹配不到任何行"）
/// - 未知键是错误，直接反馈给调用方
pub fn build_filters(params: &HashMap<String, String>) -> RepoResult<Filter> {
    let mut conditions = Vec::new();
    for (key, value) in params {
        if value.is_empty() {
            continue;
        }
        if let Some(field) = CONTAINS_FIELDS.iter().find(|f| **f == key) {
            conditions.push(Filter::Contains(field, value.clone()));
        } else if let Some(field) = EXACT_FIELDS.iter().find(|f| **f == key) {
            let value: i64 = value
                .parse()
                .map_err(|_| RepoError::InvalidFilter(format!("{key} must be an integer")))?;
            conditions.push(Filter::Eq(field, SqlValue::Int(value)));
        } else {
            return Err(RepoError::InvalidFilter(format!("Unknown filter key: {key}")));
        }
    }
    Ok(Filter::and(conditions))
}

/// Append one entry as given; failures surface to the caller
pub async fn append(pool: &SqlitePool, entry: AuditLogCreate) -> RepoResult<AuditLog> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();

    sqlx::query(
        "INSERT INTO audit_log (id, user_id, username, module, summary, method, path, status, \
         response_time, request_args, response_body, ip_address, user_agent, operation_type, \
         log_level, is_deleted, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)",
    )
    .bind(id)
    .bind(entry.user_id)
    .bind(&entry.username)
    .bind(&entry.module)
    .bind(&entry.summary)
    .bind(&entry.method)
    .bind(&entry.path)
    .bind(entry.status)
    .bind(entry.response_time)
    .bind(&entry.request_args)
    .bind(&entry.response_body)
    .bind(&entry.ip_address)
    .bind(&entry.user_agent)
    .bind(&entry.operation_type)
    .bind(&entry.log_level)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    let log = sqlx::query_as::<_, AuditLog>("SELECT * FROM audit_log WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(log)
}

/// 按日期范围 + 复合条件分页查询，最新在前
///
/// 基础谓词：`created_at ∈ [start, end]` 且未软删除；`filter` 作为
/// 额外合取项（用 [`build_filters`] 从查询参数构造）。
pub async fn list_by_date_range(
    pool: &SqlitePool,
    start_millis: i64,
    end_millis: i64,
    filter: Filter,
    page: i64,
    page_size: i64,
) -> RepoResult<(i64, Vec<AuditLog>)> {
    let filter = Filter::and(vec![
        Filter::Ge("created_at", SqlValue::Int(start_millis)),
        Filter::Le("created_at", SqlValue::Int(end_millis)),
        Filter::Eq("is_deleted", SqlValue::Bool(false)),
        filter,
    ]);
    query::list(
        pool,
        "audit_log",
        &filter,
        &[("created_at", Direction::Desc)],
        page,
        page_size,
    )
    .await
}

/// 最近 `days` 个自然日 (UTC, 含今天) 的每日条数
///
/// 返回 ISO 日期 → 数量，无记录的日期填 0；BTreeMap 保证按日期排序。
pub async fn statistics(pool: &SqlitePool, days: u32) -> RepoResult<BTreeMap<String, i64>> {
    let mut result = BTreeMap::new();
    let today = chrono::Utc::now().date_naive();
    let days = days.max(1);

    for offset in (0..days as i64).rev() {
        let date = today - chrono::Duration::days(offset);
        let (start, end) = day_bounds_millis(date);
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM audit_log WHERE created_at >= ? AND created_at < ? AND is_deleted = 0",
        )
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await?;
        result.insert(date.format("%Y-%m-%d").to_string(), count);
    }
    Ok(result)
}

/// 批量软删除，返回受影响行数
///
/// 已删除的行幂等地重复标记，不报错；整批在一个事务里提交。
pub async fn batch_soft_delete(pool: &SqlitePool, ids: &[i64]) -> RepoResult<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "UPDATE audit_log SET is_deleted = 1, updated_at = ? WHERE id IN ({placeholders})"
    );

    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;
    let mut q = sqlx::query(&sql).bind(now);
    for id in ids {
        q = q.bind(*id);
    }
    let affected = q.execute(&mut *tx).await?.rows_affected();
    tx.commit().await?;

    Ok(affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::query(
            "CREATE TABLE audit_log (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                username TEXT NOT NULL DEFAULT '',
                module TEXT NOT NULL DEFAULT '',
                summary TEXT NOT NULL DEFAULT '',
                method TEXT NOT NULL DEFAULT '',
                path TEXT NOT NULL DEFAULT '',
                status INTEGER NOT NULL DEFAULT -1,
                response_time INTEGER NOT NULL DEFAULT 0,
                request_args TEXT,
                response_body TEXT,
                ip_address TEXT NOT NULL DEFAULT '',
                user_agent TEXT NOT NULL DEFAULT '',
                operation_type TEXT NOT NULL DEFAULT '',
                log_level TEXT NOT NULL DEFAULT 'info',
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        pool
    }

    fn entry(username: &str, path: &str, status: i64) -> AuditLogCreate {
        AuditLogCreate {
            user_id: 1,
            username: username.to_string(),
            module: "user".to_string(),
            summary: "test".to_string(),
            method: "POST".to_string(),
            path: path.to_string(),
            status,
            response_time: 5,
            request_args: None,
            response_body: None,
            ip_address: "127.0.0.1".to_string(),
            user_agent: "tests".to_string(),
            operation_type: "create".to_string(),
            log_level: "info".to_string(),
        }
    }

    #[tokio::test]
    async fn append_then_query() {
        let pool = test_pool().await;
        let log = append(&pool, entry("admin", "/api/v1/user/create", 200))
            .await
            .unwrap();
        assert_eq!(log.username, "admin");
        assert!(!log.is_deleted);

        let (total, items) =
            list_by_date_range(&pool, 0, shared::util::now_millis(), Filter::All, 1, 10)
                .await
                .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].id, log.id);
    }

    #[tokio::test]
    async fn composite_filter_substring_and_exact() {
        let pool = test_pool().await;
        append(&pool, entry("admin", "/api/v1/user/create", 200)).await.unwrap();
        append(&pool, entry("admin", "/api/v1/role/create", 200)).await.unwrap();
        append(&pool, entry("admin", "/api/v1/user/delete", 500)).await.unwrap();

        // status exact 200 + path substring "user" (case-insensitive)
        let mut params = HashMap::new();
        params.insert("status".to_string(), "200".to_string());
        params.insert("path".to_string(), "USER".to_string());
        let filter = build_filters(&params).unwrap();

        let (total, items) =
            list_by_date_range(&pool, 0, shared::util::now_millis(), filter, 1, 10)
                .await
                .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].path, "/api/v1/user/create");
    }

    #[tokio::test]
    async fn empty_filter_values_are_ignored() {
        let pool = test_pool().await;
        append(&pool, entry("admin", "/api/v1/user/create", 200)).await.unwrap();

        let mut params = HashMap::new();
        params.insert("username".to_string(), String::new());
        let filter = build_filters(&params).unwrap();

        let (total, _) = list_by_date_range(&pool, 0, shared::util::now_millis(), filter, 1, 10)
            .await
            .unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn unknown_filter_key_is_an_error() {
        let mut params = HashMap::new();
        params.insert("no_such_column".to_string(), "x".to_string());
        let err = build_filters(&params).unwrap_err();
        assert!(matches!(err, RepoError::InvalidFilter(_)));

        // non-numeric value for an exact field is also surfaced
        let mut params = HashMap::new();
        params.insert("status".to_string(), "OK".to_string());
        let err = build_filters(&params).unwrap_err();
        assert!(matches!(err, RepoError::InvalidFilter(_)));
    }

    #[tokio::test]
    async fn newest_first_ordering() {
        let pool = test_pool().await;
        let first = append(&pool, entry("a", "/x", 200)).await.unwrap();
        // 手动抬高第二条的 created_at，避免同毫秒
        let second = append(&pool, entry("b", "/y", 200)).await.unwrap();
        sqlx::query("UPDATE audit_log SET created_at = created_at + 1000 WHERE id = ?")
            .bind(second.id)
            .execute(&pool)
            .await
            .unwrap();

        let (_, items) =
            list_by_date_range(&pool, 0, shared::util::now_millis() + 2000, Filter::All, 1, 10)
                .await
                .unwrap();
        assert_eq!(items[0].id, second.id);
        assert_eq!(items[1].id, first.id);
    }

    #[tokio::test]
    async fn statistics_covers_trailing_days_with_zero_fill() {
        let pool = test_pool().await;
        append(&pool, entry("admin", "/x", 200)).await.unwrap();
        append(&pool, entry("admin", "/y", 200)).await.unwrap();

        // 一条落在昨天
        let yesterday = shared::util::now_millis() - 24 * 3600 * 1000;
        let old = append(&pool, entry("admin", "/z", 200)).await.unwrap();
        sqlx::query("UPDATE audit_log SET created_at = ? WHERE id = ?")
            .bind(yesterday)
            .bind(old.id)
            .execute(&pool)
            .await
            .unwrap();

        let stats = statistics(&pool, 7).await.unwrap();
        assert_eq!(stats.len(), 7);

        let today_key = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
        assert_eq!(stats[&today_key], 2);

        let total: i64 = stats.values().sum();
        assert_eq!(total, 3);
        // days without entries are present with zero
        assert!(stats.values().any(|c| *c == 0));
    }

    #[tokio::test]
    async fn statistics_excludes_soft_deleted() {
        let pool = test_pool().await;
        let log = append(&pool, entry("admin", "/x", 200)).await.unwrap();
        batch_soft_delete(&pool, &[log.id]).await.unwrap();

        let stats = statistics(&pool, 1).await.unwrap();
        let total: i64 = stats.values().sum();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn batch_soft_delete_is_idempotent() {
        let pool = test_pool().await;
        let a = append(&pool, entry("a", "/x", 200)).await.unwrap();
        let b = append(&pool, entry("b", "/y", 200)).await.unwrap();
        let c = append(&pool, entry("c", "/z", 200)).await.unwrap();

        // pre-delete b, then batch-delete all three: still 3 rows re-marked
        assert_eq!(batch_soft_delete(&pool, &[b.id]).await.unwrap(), 1);
        assert_eq!(
            batch_soft_delete(&pool, &[a.id, b.id, c.id]).await.unwrap(),
            3
        );

        let (total, _) =
            list_by_date_range(&pool, 0, shared::util::now_millis(), Filter::All, 1, 10)
                .await
                .unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn batch_soft_delete_empty_ids() {
        let pool = test_pool().await;
        assert_eq!(batch_soft_delete(&pool, &[]).await.unwrap(), 0);
    }
}
