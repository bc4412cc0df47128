//! Department Repository
//!
//! 部门树 + 闭包表维护。所有改动闭包表的操作都在事务里执行，
//! 不变量：闭包表始终等于当前 parent 指针关系的传递闭包。

use super::{RepoError, RepoResult};
use crate::db::query::{self, Direction, Filter, SqlValue};
use shared::models::{Dept, DeptCreate, DeptUpdate};
use sqlx::{Sqlite, SqlitePool, Transaction};

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Dept>> {
    let dept = sqlx::query_as::<_, Dept>("SELECT * FROM dept WHERE id = ? AND is_deleted = 0")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(dept)
}

pub async fn find_by_name(pool: &SqlitePool, name: &str) -> RepoResult<Option<Dept>> {
    let dept = sqlx::query_as::<_, Dept>("SELECT * FROM dept WHERE name = ? LIMIT 1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(dept)
}

/// 分页列出未删除部门，可按名称模糊过滤
pub async fn list(
    pool: &SqlitePool,
    name: Option<&str>,
    page: i64,
    page_size: i64,
) -> RepoResult<(i64, Vec<Dept>)> {
    let mut conditions = vec![Filter::Eq("is_deleted", SqlValue::Bool(false))];
    if let Some(name) = name
        && !name.is_empty()
    {
        conditions.push(Filter::Contains("name", name.to_string()));
    }
    let filter = Filter::and(conditions);
    query::list(
        pool,
        "dept",
        &filter,
        &[("sort_order", Direction::Asc)],
        page,
        page_size,
    )
    .await
}

/// Create a department and extend the closure table
///
/// 新节点插入自引用行 (level 0)，并对每个到父节点的闭包行
/// `(A, parent, L)` 插入 `(A, new, L+1)`。
pub async fn create(pool: &SqlitePool, data: DeptCreate) -> RepoResult<Dept> {
    if find_by_name(pool, &data.name).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Department '{}' already exists",
            data.name
        )));
    }
    if data.parent_id != 0 && find_by_id(pool, data.parent_id).await?.is_none() {
        return Err(RepoError::Business(format!(
            "Parent department {} not found",
            data.parent_id
        )));
    }

    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO dept (id, name, description, is_deleted, sort_order, parent_id, created_at, updated_at) \
         VALUES (?, ?, ?, 0, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.order)
    .bind(data.parent_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    insert_closure_links(&mut tx, id, data.parent_id).await?;

    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create department".into()))
}

/// 自引用行 + 到新父节点所有祖先的链接
async fn insert_closure_links(
    tx: &mut Transaction<'_, Sqlite>,
    id: i64,
    parent_id: i64,
) -> RepoResult<()> {
    sqlx::query("INSERT INTO dept_closure (ancestor, descendant, level) VALUES (?, ?, 0)")
        .bind(id)
        .bind(id)
        .execute(&mut **tx)
        .await?;

    if parent_id != 0 {
        sqlx::query(
            "INSERT INTO dept_closure (ancestor, descendant, level) \
             SELECT ancestor, ?, level + 1 FROM dept_closure WHERE descendant = ?",
        )
        .bind(id)
        .bind(parent_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Update a department; a changed `parent_id` re-parents the whole subtree
///
/// Returns `Ok(None)` when the id does not exist (no-op signal).
pub async fn update(pool: &SqlitePool, id: i64, data: DeptUpdate) -> RepoResult<Option<Dept>> {
    let Some(existing) = find_by_id(pool, id).await? else {
        return Ok(None);
    };

    if let Some(ref new_name) = data.name
        && new_name != &existing.name
        && find_by_name(pool, new_name).await?.is_some()
    {
        return Err(RepoError::Duplicate(format!(
            "Department '{}' already exists",
            new_name
        )));
    }

    let reparent_to = data.parent_id.filter(|p| *p != existing.parent_id);

    if let Some(new_parent) = reparent_to {
        if new_parent != 0 {
            if find_by_id(pool, new_parent).await?.is_none() {
                return Err(RepoError::Business(format!(
                    "Parent department {} not found",
                    new_parent
                )));
            }
            // 自引用行使该检查同时覆盖 new_parent == id
            if is_ancestor_or_self(pool, id, new_parent).await? {
                return Err(RepoError::Business(
                    "Cannot move a department under itself or its own descendant".into(),
                ));
            }
        }
    }

    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE dept SET name = COALESCE(?1, name), description = COALESCE(?2, description), \
         sort_order = COALESCE(?3, sort_order), updated_at = ?4 WHERE id = ?5",
    )
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.order)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if let Some(new_parent) = reparent_to {
        // 1. 断开子树与外部祖先的所有链接（子树内部行保留）
        sqlx::query(
            "DELETE FROM dept_closure \
             WHERE descendant IN (SELECT descendant FROM dept_closure WHERE ancestor = ?1) \
             AND ancestor NOT IN (SELECT descendant FROM dept_closure WHERE ancestor = ?1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        // 2. 新父节点的祖先 × 子树成员 重新建链
        if new_parent != 0 {
            sqlx::query(
                "INSERT INTO dept_closure (ancestor, descendant, level) \
                 SELECT sup.ancestor, sub.descendant, sup.level + sub.level + 1 \
                 FROM dept_closure sup, dept_closure sub \
                 WHERE sup.descendant = ?1 AND sub.ancestor = ?2",
            )
            .bind(new_parent)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE dept SET parent_id = ?, updated_at = ? WHERE id = ?")
            .bind(new_parent)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    find_by_id(pool, id).await
}

/// Soft-delete a leaf department and drop its closure rows
///
/// Returns `Ok(false)` when the id does not exist. 带子部门的节点拒绝
/// 删除，否则闭包表会与存活的 parent 指针失配。
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    if find_by_id(pool, id).await?.is_none() {
        return Ok(false);
    }

    let children: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM dept WHERE parent_id = ? AND is_deleted = 0")
            .bind(id)
            .fetch_one(pool)
            .await?;
    if children > 0 {
        return Err(RepoError::Business(
            "Cannot delete a department that still has children".into(),
        ));
    }

    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM dept_closure WHERE ancestor = ?1 OR descendant = ?1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE dept SET is_deleted = 1, updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}

/// 所有真祖先 (level > 0)，近 → 远
pub async fn ancestors_of(pool: &SqlitePool, id: i64) -> RepoResult<Vec<Dept>> {
    let depts = sqlx::query_as::<_, Dept>(
        "SELECT d.* FROM dept d JOIN dept_closure c ON c.ancestor = d.id \
         WHERE c.descendant = ? AND c.level > 0 AND d.is_deleted = 0 ORDER BY c.level",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;
    Ok(depts)
}

/// 所有真后代 (level > 0)，近 → 远
pub async fn descendants_of(pool: &SqlitePool, id: i64) -> RepoResult<Vec<Dept>> {
    let depts = sqlx::query_as::<_, Dept>(
        "SELECT d.* FROM dept d JOIN dept_closure c ON c.descendant = d.id \
         WHERE c.ancestor = ? AND c.level > 0 AND d.is_deleted = 0 ORDER BY c.level",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;
    Ok(depts)
}

/// O(1) 祖先判定：单行 EXISTS，不走递归
pub async fn is_ancestor(pool: &SqlitePool, ancestor: i64, descendant: i64) -> RepoResult<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM dept_closure WHERE ancestor = ? AND descendant = ? AND level > 0 LIMIT 1",
    )
    .bind(ancestor)
    .bind(descendant)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

async fn is_ancestor_or_self(pool: &SqlitePool, ancestor: i64, descendant: i64) -> RepoResult<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM dept_closure WHERE ancestor = ? AND descendant = ? LIMIT 1",
    )
    .bind(ancestor)
    .bind(descendant)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::{BTreeSet, HashMap};

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::query(
            "CREATE TABLE dept (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                sort_order INTEGER NOT NULL DEFAULT 0,
                parent_id INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "CREATE TABLE dept_closure (
                id INTEGER PRIMARY KEY,
                ancestor INTEGER NOT NULL,
                descendant INTEGER NOT NULL,
                level INTEGER NOT NULL DEFAULT 0,
                UNIQUE (ancestor, descendant)
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        pool
    }

    async fn mk(pool: &SqlitePool, name: &str, parent_id: i64) -> Dept {
        create(
            pool,
            DeptCreate {
                name: name.to_string(),
                description: None,
                order: 0,
                parent_id,
            },
        )
        .await
        .unwrap()
    }

    /// 从当前 parent 指针重新计算传递闭包，与闭包表逐行比对
    async fn assert_closure_consistent(pool: &SqlitePool) {
        let parents: Vec<(i64, i64)> =
            sqlx::query_as("SELECT id, parent_id FROM dept WHERE is_deleted = 0")
                .fetch_all(pool)
                .await
                .unwrap();
        let parent_of: HashMap<i64, i64> = parents.iter().cloned().collect();

        let mut expected: BTreeSet<(i64, i64, i64)> = BTreeSet::new();
        for (id, _) in &parents {
            let mut current = *id;
            let mut level = 0_i64;
            loop {
                expected.insert((current, *id, level));
                match parent_of.get(&current) {
                    Some(&p) if p != 0 => {
                        current = p;
                        level += 1;
                    }
                    _ => break,
                }
            }
        }

        let actual: BTreeSet<(i64, i64, i64)> =
            sqlx::query_as::<_, (i64, i64, i64)>("SELECT ancestor, descendant, level FROM dept_closure")
                .fetch_all(pool)
                .await
                .unwrap()
                .into_iter()
                .collect();

        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn create_builds_ancestor_chain() {
        let pool = test_pool().await;
        let a = mk(&pool, "A", 0).await;
        let b = mk(&pool, "B", a.id).await;
        let c = mk(&pool, "C", b.id).await;

        let ancestors = ancestors_of(&pool, c.id).await.unwrap();
        let names: BTreeSet<String> = ancestors.into_iter().map(|d| d.name).collect();
        assert_eq!(names, BTreeSet::from(["A".to_string(), "B".to_string()]));

        assert!(is_ancestor(&pool, a.id, c.id).await.unwrap());
        assert!(!is_ancestor(&pool, c.id, a.id).await.unwrap());
        // self is not its own ancestor
        assert!(!is_ancestor(&pool, a.id, a.id).await.unwrap());

        assert_closure_consistent(&pool).await;
    }

    #[tokio::test]
    async fn descendants_cover_whole_subtree() {
        let pool = test_pool().await;
        let a = mk(&pool, "A", 0).await;
        let b = mk(&pool, "B", a.id).await;
        let c = mk(&pool, "C", b.id).await;
        let d = mk(&pool, "D", a.id).await;

        let descendants = descendants_of(&pool, a.id).await.unwrap();
        let ids: BTreeSet<i64> = descendants.into_iter().map(|x| x.id).collect();
        assert_eq!(ids, BTreeSet::from([b.id, c.id, d.id]));
    }

    #[tokio::test]
    async fn reparent_moves_subtree_intact() {
        let pool = test_pool().await;
        let a = mk(&pool, "A", 0).await;
        let b = mk(&pool, "B", a.id).await;
        let c = mk(&pool, "C", b.id).await;
        let d = mk(&pool, "D", a.id).await;

        // Move B (with child C) under D
        let updated = update(
            &pool,
            b.id,
            DeptUpdate {
                parent_id: Some(d.id),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(updated.parent_id, d.id);

        assert!(is_ancestor(&pool, d.id, c.id).await.unwrap());
        assert!(is_ancestor(&pool, a.id, c.id).await.unwrap());
        // B keeps its own subtree
        assert!(is_ancestor(&pool, b.id, c.id).await.unwrap());

        assert_closure_consistent(&pool).await;
    }

    #[tokio::test]
    async fn reparent_to_root() {
        let pool = test_pool().await;
        let a = mk(&pool, "A", 0).await;
        let b = mk(&pool, "B", a.id).await;
        let c = mk(&pool, "C", b.id).await;

        update(
            &pool,
            b.id,
            DeptUpdate {
                parent_id: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

        assert!(!is_ancestor(&pool, a.id, b.id).await.unwrap());
        assert!(!is_ancestor(&pool, a.id, c.id).await.unwrap());
        assert!(is_ancestor(&pool, b.id, c.id).await.unwrap());
        assert_closure_consistent(&pool).await;
    }

    #[tokio::test]
    async fn reparent_under_own_descendant_rejected() {
        let pool = test_pool().await;
        let a = mk(&pool, "A", 0).await;
        let b = mk(&pool, "B", a.id).await;
        let c = mk(&pool, "C", b.id).await;

        let err = update(
            &pool,
            a.id,
            DeptUpdate {
                parent_id: Some(c.id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::Business(_)));

        // nothing changed
        assert_closure_consistent(&pool).await;
    }

    #[tokio::test]
    async fn delete_leaf_removes_closure_rows() {
        let pool = test_pool().await;
        let a = mk(&pool, "A", 0).await;
        let b = mk(&pool, "B", a.id).await;
        let c = mk(&pool, "C", b.id).await;

        assert!(delete(&pool, c.id).await.unwrap());

        let remaining: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM dept_closure WHERE ancestor = ?1 OR descendant = ?1",
        )
        .bind(c.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(remaining, 0);
        assert_closure_consistent(&pool).await;
    }

    #[tokio::test]
    async fn delete_with_children_rejected() {
        let pool = test_pool().await;
        let a = mk(&pool, "A", 0).await;
        let _b = mk(&pool, "B", a.id).await;

        let err = delete(&pool, a.id).await.unwrap_err();
        assert!(matches!(err, RepoError::Business(_)));
        assert_closure_consistent(&pool).await;
    }

    #[tokio::test]
    async fn delete_missing_is_noop() {
        let pool = test_pool().await;
        assert!(!delete(&pool, 42).await.unwrap());
    }

    #[tokio::test]
    async fn update_missing_is_noop() {
        let pool = test_pool().await;
        let result = update(&pool, 42, DeptUpdate::default()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn duplicate_name_rejected() {
        let pool = test_pool().await;
        mk(&pool, "A", 0).await;
        let err = create(
            &pool,
            DeptCreate {
                name: "A".to_string(),
                description: None,
                order: 0,
                parent_id: 0,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn create_under_missing_parent_rejected() {
        let pool = test_pool().await;
        let err = create(
            &pool,
            DeptCreate {
                name: "orphan".to_string(),
                description: None,
                order: 0,
                parent_id: 999,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::Business(_)));
    }

    #[tokio::test]
    async fn random_operation_sequence_keeps_invariant() {
        let pool = test_pool().await;
        let a = mk(&pool, "A", 0).await;
        let b = mk(&pool, "B", a.id).await;
        let c = mk(&pool, "C", b.id).await;
        let d = mk(&pool, "D", 0).await;
        let e = mk(&pool, "E", d.id).await;

        assert_closure_consistent(&pool).await;

        // move C under E, delete B, move E under A
        update(&pool, c.id, DeptUpdate { parent_id: Some(e.id), ..Default::default() })
            .await
            .unwrap();
        assert_closure_consistent(&pool).await;

        delete(&pool, b.id).await.unwrap();
        assert_closure_consistent(&pool).await;

        update(&pool, e.id, DeptUpdate { parent_id: Some(a.id), ..Default::default() })
            .await
            .unwrap();
        assert_closure_consistent(&pool).await;

        assert!(is_ancestor(&pool, a.id, c.id).await.unwrap());
        assert!(!is_ancestor(&pool, d.id, e.id).await.unwrap());
    }
}
