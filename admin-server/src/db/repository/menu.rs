//! Menu Repository

use super::{RepoError, RepoResult};
use crate::db::query::{self, Direction, Filter};
use shared::models::{Menu, MenuCreate, MenuUpdate};
use sqlx::SqlitePool;

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Menu>> {
    let menu = sqlx::query_as::<_, Menu>("SELECT * FROM menu WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(menu)
}

/// 分页列出菜单，可按名称模糊过滤，排序值优先
pub async fn list(
    pool: &SqlitePool,
    name: Option<&str>,
    page: i64,
    page_size: i64,
) -> RepoResult<(i64, Vec<Menu>)> {
    let filter = match name {
        Some(name) if !name.is_empty() => Filter::Contains("name", name.to_string()),
        _ => Filter::All,
    };
    query::list(
        pool,
        "menu",
        &filter,
        &[("sort_order", Direction::Asc)],
        page,
        page_size,
    )
    .await
}

pub async fn create(pool: &SqlitePool, data: MenuCreate) -> RepoResult<Menu> {
    if data.parent_id != 0 && find_by_id(pool, data.parent_id).await?.is_none() {
        return Err(RepoError::Business(format!(
            "Parent menu {} not found",
            data.parent_id
        )));
    }

    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO menu (id, name, remark, menu_type, icon, path, sort_order, parent_id, \
         is_hidden, component, keepalive, redirect, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.remark)
    .bind(data.menu_type)
    .bind(&data.icon)
    .bind(&data.path)
    .bind(data.order)
    .bind(data.parent_id)
    .bind(data.is_hidden)
    .bind(&data.component)
    .bind(data.keepalive)
    .bind(&data.redirect)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create menu".into()))
}

/// Returns `Ok(None)` when the id does not exist (no-op signal).
pub async fn update(pool: &SqlitePool, id: i64, data: MenuUpdate) -> RepoResult<Option<Menu>> {
    if find_by_id(pool, id).await?.is_none() {
        return Ok(None);
    }

    if let Some(parent_id) = data.parent_id
        && parent_id != 0
    {
        if parent_id == id {
            return Err(RepoError::Business("Menu cannot be its own parent".into()));
        }
        if find_by_id(pool, parent_id).await?.is_none() {
            return Err(RepoError::Business(format!(
                "Parent menu {} not found",
                parent_id
            )));
        }
    }

    let now = shared::util::now_millis();
    sqlx::query(
        "UPDATE menu SET name = COALESCE(?1, name), remark = COALESCE(?2, remark), \
         menu_type = COALESCE(?3, menu_type), icon = COALESCE(?4, icon), \
         path = COALESCE(?5, path), sort_order = COALESCE(?6, sort_order), \
         parent_id = COALESCE(?7, parent_id), is_hidden = COALESCE(?8, is_hidden), \
         component = COALESCE(?9, component), keepalive = COALESCE(?10, keepalive), \
         redirect = COALESCE(?11, redirect), updated_at = ?12 WHERE id = ?13",
    )
    .bind(&data.name)
    .bind(&data.remark)
    .bind(data.menu_type)
    .bind(&data.icon)
    .bind(&data.path)
    .bind(data.order)
    .bind(data.parent_id)
    .bind(data.is_hidden)
    .bind(&data.component)
    .bind(data.keepalive)
    .bind(&data.redirect)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    find_by_id(pool, id).await
}

/// Returns `Ok(false)` when the id does not exist. 有子菜单的节点拒绝删除。
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    if find_by_id(pool, id).await?.is_none() {
        return Ok(false);
    }

    let children: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM menu WHERE parent_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if children > 0 {
        return Err(RepoError::Business(
            "Cannot delete a menu that still has children".into(),
        ));
    }

    let rows = sqlx::query("DELETE FROM menu WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::MenuType;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::query(
            "CREATE TABLE menu (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                remark TEXT,
                menu_type TEXT,
                icon TEXT,
                path TEXT NOT NULL,
                sort_order INTEGER NOT NULL DEFAULT 0,
                parent_id INTEGER NOT NULL DEFAULT 0,
                is_hidden INTEGER NOT NULL DEFAULT 0,
                component TEXT NOT NULL,
                keepalive INTEGER NOT NULL DEFAULT 1,
                redirect TEXT,
                created_at INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        pool
    }

    fn menu(name: &str, path: &str, parent_id: i64, order: i64) -> MenuCreate {
        MenuCreate {
            name: name.to_string(),
            remark: None,
            menu_type: Some(MenuType::Menu),
            icon: None,
            path: path.to_string(),
            order,
            parent_id,
            is_hidden: false,
            component: "Layout".to_string(),
            keepalive: true,
            redirect: None,
        }
    }

    #[tokio::test]
    async fn create_with_json_remark() {
        let pool = test_pool().await;
        let mut data = menu("system", "/system", 0, 1);
        data.remark = Some(serde_json::json!({"badge": "new"}));
        let m = create(&pool, data).await.unwrap();
        assert_eq!(m.remark, Some(serde_json::json!({"badge": "new"})));
    }

    #[tokio::test]
    async fn list_orders_by_sort_order() {
        let pool = test_pool().await;
        create(&pool, menu("b", "/b", 0, 2)).await.unwrap();
        create(&pool, menu("a", "/a", 0, 1)).await.unwrap();

        let (total, items) = list(&pool, None, 1, 10).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(items[0].name, "a");
        assert_eq!(items[1].name, "b");
    }

    #[tokio::test]
    async fn delete_with_children_rejected() {
        let pool = test_pool().await;
        let parent = create(&pool, menu("system", "/system", 0, 1)).await.unwrap();
        let child = create(&pool, menu("users", "/system/users", parent.id, 1))
            .await
            .unwrap();

        let err = delete(&pool, parent.id).await.unwrap_err();
        assert!(matches!(err, RepoError::Business(_)));

        assert!(delete(&pool, child.id).await.unwrap());
        assert!(delete(&pool, parent.id).await.unwrap());
    }

    #[tokio::test]
    async fn update_missing_is_noop() {
        let pool = test_pool().await;
        assert!(update(&pool, 404, MenuUpdate::default()).await.unwrap().is_none());
        assert!(!delete(&pool, 404).await.unwrap());
    }
}
