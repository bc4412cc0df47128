//! Role Repository

use super::{RepoError, RepoResult};
use crate::db::query::{self, Direction, Filter};
use shared::models::{Permission, Role, RoleCreate, RoleUpdate};
use sqlx::SqlitePool;

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Role>> {
    let role = sqlx::query_as::<_, Role>("SELECT * FROM role WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(role)
}

pub async fn find_by_name(pool: &SqlitePool, name: &str) -> RepoResult<Option<Role>> {
    let role = sqlx::query_as::<_, Role>("SELECT * FROM role WHERE name = ? LIMIT 1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(role)
}

/// 分页列出角色，可按名称模糊过滤
pub async fn list(
    pool: &SqlitePool,
    name: Option<&str>,
    page: i64,
    page_size: i64,
) -> RepoResult<(i64, Vec<Role>)> {
    let filter = match name {
        Some(name) if !name.is_empty() => Filter::Contains("name", name.to_string()),
        _ => Filter::All,
    };
    query::list(
        pool,
        "role",
        &filter,
        &[("name", Direction::Asc)],
        page,
        page_size,
    )
    .await
}

pub async fn create(pool: &SqlitePool, data: RoleCreate) -> RepoResult<Role> {
    if find_by_name(pool, &data.name).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Role '{}' already exists",
            data.name
        )));
    }

    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO role (id, name, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.description)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create role".into()))
}

/// Returns `Ok(None)` when the id does not exist (no-op signal).
pub async fn update(pool: &SqlitePool, id: i64, data: RoleUpdate) -> RepoResult<Option<Role>> {
    let Some(existing) = find_by_id(pool, id).await? else {
        return Ok(None);
    };

    if let Some(ref name) = data.name
        && name != &existing.name
        && find_by_name(pool, name).await?.is_some()
    {
        return Err(RepoError::Duplicate(format!(
            "Role '{}' already exists",
            name
        )));
    }

    let now = shared::util::now_millis();
    sqlx::query(
        "UPDATE role SET name = COALESCE(?1, name), description = COALESCE(?2, description), \
         updated_at = ?3 WHERE id = ?4",
    )
    .bind(&data.name)
    .bind(&data.description)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    find_by_id(pool, id).await
}

/// Delete a role and its grant/assignment links
///
/// Returns `Ok(false)` when the id does not exist.
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM role_permission WHERE role_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM user_role WHERE role_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let rows = sqlx::query("DELETE FROM role WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(rows.rows_affected() > 0)
}

/// 角色已授权的权限 ID 集合
pub async fn permission_ids_of(pool: &SqlitePool, role_id: i64) -> RepoResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT permission_id FROM role_permission WHERE role_id = ? ORDER BY permission_id",
    )
    .bind(role_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// 角色已授权的权限实体
pub async fn permissions_of(pool: &SqlitePool, role_id: i64) -> RepoResult<Vec<Permission>> {
    let permissions = sqlx::query_as::<_, Permission>(
        "SELECT p.* FROM permission p JOIN role_permission rp ON rp.permission_id = p.id \
         WHERE rp.role_id = ? ORDER BY p.sort_order, p.id",
    )
    .bind(role_id)
    .fetch_all(pool)
    .await?;
    Ok(permissions)
}

/// 整体替换角色的权限集合 (一个事务)
///
/// Returns `Ok(false)` when the role does not exist.
pub async fn authorize(
    pool: &SqlitePool,
    role_id: i64,
    permission_ids: &[i64],
) -> RepoResult<bool> {
    if find_by_id(pool, role_id).await?.is_none() {
        return Ok(false);
    }

    if !permission_ids.is_empty() {
        let placeholders = vec!["?"; permission_ids.len()].join(", ");
        let sql = format!("SELECT COUNT(*) FROM permission WHERE id IN ({placeholders})");
        let mut q = sqlx::query_scalar::<_, i64>(&sql);
        for id in permission_ids {
            q = q.bind(*id);
        }
        let found = q.fetch_one(pool).await?;
        if found != permission_ids.len() as i64 {
            return Err(RepoError::Business(
                "One or more permissions do not exist".into(),
            ));
        }
    }

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM role_permission WHERE role_id = ?")
        .bind(role_id)
        .execute(&mut *tx)
        .await?;
    for permission_id in permission_ids {
        sqlx::query("INSERT INTO role_permission (role_id, permission_id) VALUES (?, ?)")
            .bind(role_id)
            .bind(*permission_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(true)
}
