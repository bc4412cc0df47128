//! Permission Repository
//!
//! `code` 缺省时在首次持久化前用生成器推导；生成结果（含时间戳兜底）
//! 与既有代码冲突时由 UNIQUE 约束拦下，以 Duplicate 形式反馈，绝不
//! 静默覆盖。

use super::{RepoError, RepoResult};
use crate::db::query::{self, Direction, Filter, SqlValue};
use shared::models::{Permission, PermissionCreate, PermissionType, PermissionUpdate};
use sqlx::SqlitePool;

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Permission>> {
    let permission = sqlx::query_as::<_, Permission>("SELECT * FROM permission WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(permission)
}

pub async fn find_by_code(pool: &SqlitePool, code: &str) -> RepoResult<Option<Permission>> {
    let permission =
        sqlx::query_as::<_, Permission>("SELECT * FROM permission WHERE code = ? LIMIT 1")
            .bind(code)
            .fetch_optional(pool)
            .await?;
    Ok(permission)
}

/// 分页列出权限，可按名称模糊、类型/父节点精确过滤
pub async fn list(
    pool: &SqlitePool,
    name: Option<&str>,
    permission_type: Option<PermissionType>,
    parent_id: Option<i64>,
    page: i64,
    page_size: i64,
) -> RepoResult<(i64, Vec<Permission>)> {
    let mut conditions = Vec::new();
    if let Some(name) = name
        && !name.is_empty()
    {
        conditions.push(Filter::Contains("name", name.to_string()));
    }
    if let Some(ptype) = permission_type {
        let value = match ptype {
            PermissionType::Module => "module",
            PermissionType::Feature => "feature",
            PermissionType::Action => "action",
        };
        conditions.push(Filter::Eq("permission_type", SqlValue::Text(value.into())));
    }
    if let Some(parent_id) = parent_id {
        conditions.push(Filter::Eq("parent_id", SqlValue::Int(parent_id)));
    }
    let filter = Filter::and(conditions);
    query::list(
        pool,
        "permission",
        &filter,
        &[("sort_order", Direction::Asc)],
        page,
        page_size,
    )
    .await
}

/// 所有启用的权限，按排序值
pub async fn all_active(pool: &SqlitePool) -> RepoResult<Vec<Permission>> {
    let permissions = sqlx::query_as::<_, Permission>(
        "SELECT * FROM permission WHERE is_active = 1 ORDER BY sort_order, id",
    )
    .fetch_all(pool)
    .await?;
    Ok(permissions)
}

/// Create a permission, deriving the code when absent
pub async fn create(pool: &SqlitePool, data: PermissionCreate) -> RepoResult<Permission> {
    if data.parent_id != 0 && find_by_id(pool, data.parent_id).await?.is_none() {
        return Err(RepoError::Business(format!(
            "Parent permission {} not found",
            data.parent_id
        )));
    }

    let code = match data.code.as_deref().filter(|c| !c.is_empty()) {
        Some(code) => code.to_string(),
        None => Permission::generate_code(
            data.permission_type,
            data.api_path.as_deref(),
            data.api_method,
            data.menu_path.as_deref(),
            Some(&data.name),
        ),
    };

    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();

    sqlx::query(
        "INSERT INTO permission (id, name, code, description, permission_type, parent_id, \
         sort_order, is_active, menu_path, menu_icon, menu_component, is_hidden, api_path, \
         api_method, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&code)
    .bind(&data.description)
    .bind(data.permission_type)
    .bind(data.parent_id)
    .bind(data.order)
    .bind(data.is_active)
    .bind(&data.menu_path)
    .bind(&data.menu_icon)
    .bind(&data.menu_component)
    .bind(data.is_hidden)
    .bind(&data.api_path)
    .bind(data.api_method)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create permission".into()))
}

/// Update a permission; an explicit `code` overrides the derived one
///
/// Returns `Ok(None)` when the id does not exist (no-op signal).
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    data: PermissionUpdate,
) -> RepoResult<Option<Permission>> {
    if find_by_id(pool, id).await?.is_none() {
        return Ok(None);
    }

    if let Some(parent_id) = data.parent_id
        && parent_id != 0
    {
        if parent_id == id {
            return Err(RepoError::Business(
                "Permission cannot be its own parent".into(),
            ));
        }
        if find_by_id(pool, parent_id).await?.is_none() {
            return Err(RepoError::Business(format!(
                "Parent permission {} not found",
                parent_id
            )));
        }
    }

    let now = shared::util::now_millis();
    sqlx::query(
        "UPDATE permission SET name = COALESCE(?1, name), code = COALESCE(?2, code), \
         description = COALESCE(?3, description), permission_type = COALESCE(?4, permission_type), \
         parent_id = COALESCE(?5, parent_id), sort_order = COALESCE(?6, sort_order), \
         is_active = COALESCE(?7, is_active), menu_path = COALESCE(?8, menu_path), \
         menu_icon = COALESCE(?9, menu_icon), menu_component = COALESCE(?10, menu_component), \
         is_hidden = COALESCE(?11, is_hidden), api_path = COALESCE(?12, api_path), \
         api_method = COALESCE(?13, api_method), updated_at = ?14 WHERE id = ?15",
    )
    .bind(&data.name)
    .bind(&data.code)
    .bind(&data.description)
    .bind(data.permission_type)
    .bind(data.parent_id)
    .bind(data.order)
    .bind(data.is_active)
    .bind(&data.menu_path)
    .bind(&data.menu_icon)
    .bind(&data.menu_component)
    .bind(data.is_hidden)
    .bind(&data.api_path)
    .bind(data.api_method)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    find_by_id(pool, id).await
}

/// Delete a permission and its role grants
///
/// Returns `Ok(false)` when the id does not exist. 有子权限的节点拒绝删除。
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    if find_by_id(pool, id).await?.is_none() {
        return Ok(false);
    }

    let children: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permission WHERE parent_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if children > 0 {
        return Err(RepoError::Business(
            "Cannot delete a permission that still has children".into(),
        ));
    }

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM role_permission WHERE permission_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let rows = sqlx::query("DELETE FROM permission WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(rows.rows_affected() > 0)
}
