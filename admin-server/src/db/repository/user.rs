//! User Repository

use super::{RepoError, RepoResult};
use crate::auth::password;
use crate::db::query::{self, Direction, Filter, SqlValue};
use shared::models::{Permission, Role, User, UserCreate, UserUpdate};
use sqlx::{Sqlite, SqlitePool, Transaction};

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM user WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> RepoResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM user WHERE username = ? LIMIT 1")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> RepoResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM user WHERE email = ? LIMIT 1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// 分页列出用户，可按用户名/邮箱模糊、部门精确过滤
pub async fn list(
    pool: &SqlitePool,
    username: Option<&str>,
    email: Option<&str>,
    dept_id: Option<i64>,
    page: i64,
    page_size: i64,
) -> RepoResult<(i64, Vec<User>)> {
    let mut conditions = Vec::new();
    if let Some(username) = username
        && !username.is_empty()
    {
        conditions.push(Filter::Contains("username", username.to_string()));
    }
    if let Some(email) = email
        && !email.is_empty()
    {
        conditions.push(Filter::Contains("email", email.to_string()));
    }
    if let Some(dept_id) = dept_id {
        conditions.push(Filter::Eq("dept_id", SqlValue::Int(dept_id)));
    }
    let filter = Filter::and(conditions);
    query::list(
        pool,
        "user",
        &filter,
        &[("created_at", Direction::Desc)],
        page,
        page_size,
    )
    .await
}

/// 用户的角色 ID 集合
pub async fn role_ids_of(pool: &SqlitePool, user_id: i64) -> RepoResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT role_id FROM user_role WHERE user_id = ? ORDER BY role_id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// 用户的角色实体
pub async fn roles_of(pool: &SqlitePool, user_id: i64) -> RepoResult<Vec<Role>> {
    let roles = sqlx::query_as::<_, Role>(
        "SELECT r.* FROM role r JOIN user_role ur ON ur.role_id = r.id \
         WHERE ur.user_id = ? ORDER BY r.name",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(roles)
}

/// 角色→权限展开：用户经由角色获得的全部启用权限（去重）
pub async fn permissions_of(pool: &SqlitePool, user_id: i64) -> RepoResult<Vec<Permission>> {
    let permissions = sqlx::query_as::<_, Permission>(
        "SELECT DISTINCT p.* FROM permission p \
         JOIN role_permission rp ON rp.permission_id = p.id \
         JOIN user_role ur ON ur.role_id = rp.role_id \
         WHERE ur.user_id = ? AND p.is_active = 1 \
         ORDER BY p.sort_order, p.id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(permissions)
}

async fn check_roles_exist(pool: &SqlitePool, role_ids: &[i64]) -> RepoResult<()> {
    if role_ids.is_empty() {
        return Ok(());
    }
    let placeholders = vec!["?"; role_ids.len()].join(", ");
    let sql = format!("SELECT COUNT(*) FROM role WHERE id IN ({placeholders})");
    let mut q = sqlx::query_scalar::<_, i64>(&sql);
    for id in role_ids {
        q = q.bind(*id);
    }
    let found = q.fetch_one(pool).await?;
    if found != role_ids.len() as i64 {
        return Err(RepoError::Business("One or more roles do not exist".into()));
    }
    Ok(())
}

async fn replace_roles(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    role_ids: &[i64],
) -> RepoResult<()> {
    sqlx::query("DELETE FROM user_role WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    for role_id in role_ids {
        sqlx::query("INSERT INTO user_role (user_id, role_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(*role_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// Create a new user with its role assignments
pub async fn create(pool: &SqlitePool, data: UserCreate) -> RepoResult<User> {
    if find_by_username(pool, &data.username).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Username '{}' already exists",
            data.username
        )));
    }
    if let Some(ref email) = data.email
        && !email.is_empty()
        && find_by_email(pool, email).await?.is_some()
    {
        return Err(RepoError::Duplicate(format!(
            "Email '{}' already exists",
            email
        )));
    }
    check_roles_exist(pool, &data.role_ids).await?;

    let hash = password::hash_password(&data.password)
        .map_err(|e| RepoError::Database(format!("Failed to hash password: {e}")))?;

    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();

    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO user (id, username, nickname, email, phone, password, is_active, \
         is_superuser, dept_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&data.username)
    .bind(&data.nickname)
    .bind(&data.email)
    .bind(&data.phone)
    .bind(&hash)
    .bind(data.is_active)
    .bind(data.is_superuser)
    .bind(data.dept_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    replace_roles(&mut tx, id, &data.role_ids).await?;
    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create user".into()))
}

/// Update a user; `role_ids` replaces the whole role set when present
///
/// Returns `Ok(None)` when the id does not exist (no-op signal).
pub async fn update(pool: &SqlitePool, id: i64, data: UserUpdate) -> RepoResult<Option<User>> {
    let Some(existing) = find_by_id(pool, id).await? else {
        return Ok(None);
    };

    if let Some(ref username) = data.username
        && username != &existing.username
        && find_by_username(pool, username).await?.is_some()
    {
        return Err(RepoError::Duplicate(format!(
            "Username '{}' already exists",
            username
        )));
    }
    if let Some(ref email) = data.email
        && !email.is_empty()
        && existing.email.as_deref() != Some(email.as_str())
        && find_by_email(pool, email).await?.is_some()
    {
        return Err(RepoError::Duplicate(format!(
            "Email '{}' already exists",
            email
        )));
    }
    if let Some(ref role_ids) = data.role_ids {
        check_roles_exist(pool, role_ids).await?;
    }

    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE user SET username = COALESCE(?1, username), nickname = COALESCE(?2, nickname), \
         email = COALESCE(?3, email), phone = COALESCE(?4, phone), \
         is_active = COALESCE(?5, is_active), is_superuser = COALESCE(?6, is_superuser), \
         dept_id = COALESCE(?7, dept_id), updated_at = ?8 WHERE id = ?9",
    )
    .bind(&data.username)
    .bind(&data.nickname)
    .bind(&data.email)
    .bind(&data.phone)
    .bind(data.is_active)
    .bind(data.is_superuser)
    .bind(data.dept_id)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if let Some(ref role_ids) = data.role_ids {
        replace_roles(&mut tx, id, role_ids).await?;
    }

    tx.commit().await?;
    find_by_id(pool, id).await
}

/// Delete a user and its role links
///
/// Returns `Ok(false)` when the id does not exist.
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM user_role WHERE user_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let rows = sqlx::query("DELETE FROM user WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(rows.rows_affected() > 0)
}

/// 登录成功后刷新 last_login
pub async fn set_last_login(pool: &SqlitePool, id: i64) -> RepoResult<()> {
    let now = shared::util::now_millis();
    sqlx::query("UPDATE user SET last_login = ?, updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// 重设口令 (存储 argon2 哈希)
pub async fn update_password(pool: &SqlitePool, id: i64, new_password: &str) -> RepoResult<bool> {
    let hash = password::hash_password(new_password)
        .map_err(|e| RepoError::Database(format!("Failed to hash password: {e}")))?;
    let now = shared::util::now_millis();
    let rows = sqlx::query("UPDATE user SET password = ?, updated_at = ? WHERE id = ?")
        .bind(&hash)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// 首次启动时保证存在超级管理员 (admin / 123456)
pub async fn ensure_superuser(pool: &SqlitePool) -> RepoResult<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    create(
        pool,
        UserCreate {
            username: "admin".to_string(),
            password: "123456".to_string(),
            nickname: Some("Administrator".to_string()),
            email: Some("admin@example.com".to_string()),
            phone: None,
            is_active: true,
            is_superuser: true,
            dept_id: None,
            role_ids: vec![],
        },
    )
    .await?;
    tracing::warn!("Created default superuser 'admin' with password '123456' — change it!");
    Ok(())
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
            "CREATE TABLE user (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                nickname TEXT,
                email TEXT UNIQUE,
                phone TEXT,
                password TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                is_superuser INTEGER NOT NULL DEFAULT 0,
                last_login INTEGER,
                dept_id INTEGER,
                created_at INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "CREATE TABLE role (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                created_at INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "CREATE TABLE user_role (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                role_id INTEGER NOT NULL,
                UNIQUE (user_id, role_id)
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "CREATE TABLE role_permission (
                id INTEGER PRIMARY KEY,
                role_id INTEGER NOT NULL,
                permission_id INTEGER NOT NULL,
                UNIQUE (role_id, permission_id)
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "CREATE TABLE permission (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                code TEXT NOT NULL UNIQUE,
                description TEXT,
                permission_type TEXT NOT NULL,
                parent_id INTEGER NOT NULL DEFAULT 0,
                sort_order INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                menu_path TEXT,
                menu_icon TEXT,
                menu_component TEXT,
                is_hidden INTEGER NOT NULL DEFAULT 0,
                api_path TEXT,
                api_method TEXT,
                created_at INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        // Seed: two roles, two permissions, one granted to each role
        sqlx::query("INSERT INTO role (id, name) VALUES (1, 'admin'), (2, 'auditor')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO permission (id, name, code, permission_type) VALUES \
             (10, 'user list', 'api.user.list.get', 'action'), \
             (11, 'audit list', 'api.auditlog.list.get', 'action')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO role_permission (role_id, permission_id) VALUES (1, 10), (2, 11)")
            .execute(&pool)
            .await
            .unwrap();

        pool
    }

    fn user_create(username: &str, role_ids: Vec<i64>) -> UserCreate {
        UserCreate {
            username: username.to_string(),
            password: "pass".to_string(),
            nickname: None,
            email: Some(format!("{username}@example.com")),
            phone: None,
            is_active: true,
            is_superuser: false,
            dept_id: None,
            role_ids,
        }
    }

    #[tokio::test]
    async fn create_assigns_roles_and_hashes_password() {
        let pool = test_pool().await;
        let user = create(&pool, user_create("alice", vec![1, 2])).await.unwrap();

        assert_ne!(user.password, "pass");
        assert!(password::verify_password("pass", &user.password).unwrap());
        assert_eq!(role_ids_of(&pool, user.id).await.unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn duplicate_username_and_email_rejected() {
        let pool = test_pool().await;
        create(&pool, user_create("alice", vec![])).await.unwrap();

        let err = create(&pool, user_create("alice", vec![])).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));

        let mut data = user_create("bob", vec![]);
        data.email = Some("alice@example.com".to_string());
        let err = create(&pool, data).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn create_with_unknown_role_rejected() {
        let pool = test_pool().await;
        let err = create(&pool, user_create("alice", vec![99])).await.unwrap_err();
        assert!(matches!(err, RepoError::Business(_)));
    }

    #[tokio::test]
    async fn update_replaces_role_set() {
        let pool = test_pool().await;
        let user = create(&pool, user_create("alice", vec![1])).await.unwrap();

        let updated = update(
            &pool,
            user.id,
            UserUpdate {
                role_ids: Some(vec![2]),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(updated.username, "alice");
        assert_eq!(role_ids_of(&pool, user.id).await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn update_missing_is_noop() {
        let pool = test_pool().await;
        let result = update(&pool, 404, UserUpdate::default()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn permission_expansion_via_roles() {
        let pool = test_pool().await;
        let user = create(&pool, user_create("alice", vec![1, 2])).await.unwrap();

        let perms = permissions_of(&pool, user.id).await.unwrap();
        let codes: Vec<&str> = perms.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["api.user.list.get", "api.auditlog.list.get"]);

        // dropping a role narrows the expansion
        update(
            &pool,
            user.id,
            UserUpdate {
                role_ids: Some(vec![2]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let perms = permissions_of(&pool, user.id).await.unwrap();
        assert_eq!(perms.len(), 1);
        assert_eq!(perms[0].code, "api.auditlog.list.get");
    }

    #[tokio::test]
    async fn delete_removes_user_and_links() {
        let pool = test_pool().await;
        let user = create(&pool, user_create("alice", vec![1])).await.unwrap();

        assert!(delete(&pool, user.id).await.unwrap());
        assert!(find_by_id(&pool, user.id).await.unwrap().is_none());
        assert!(role_ids_of(&pool, user.id).await.unwrap().is_empty());

        // second delete is a no-op signal
        assert!(!delete(&pool, user.id).await.unwrap());
    }

    #[tokio::test]
    async fn password_update_and_login_stamp() {
        let pool = test_pool().await;
        let user = create(&pool, user_create("alice", vec![])).await.unwrap();

        assert!(update_password(&pool, user.id, "newpass").await.unwrap());
        let reloaded = find_by_id(&pool, user.id).await.unwrap().unwrap();
        assert!(password::verify_password("newpass", &reloaded.password).unwrap());

        assert!(reloaded.last_login.is_none());
        set_last_login(&pool, user.id).await.unwrap();
        let reloaded = find_by_id(&pool, user.id).await.unwrap().unwrap();
        assert!(reloaded.last_login.is_some());
    }

    #[tokio::test]
    async fn ensure_superuser_is_idempotent() {
        let pool = test_pool().await;
        ensure_superuser(&pool).await.unwrap();
        ensure_superuser(&pool).await.unwrap();

        let admin = find_by_username(&pool, "admin").await.unwrap().unwrap();
        assert!(admin.is_superuser);
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn list_filters_by_username_substring() {
        let pool = test_pool().await;
        create(&pool, user_create("alice", vec![])).await.unwrap();
        create(&pool, user_create("bob", vec![])).await.unwrap();
        create(&pool, user_create("malice", vec![])).await.unwrap();

        let (total, items) = list(&pool, Some("lice"), None, None, 1, 10).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(items.len(), 2);
    }
}
