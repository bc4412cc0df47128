use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::JwtService;
use crate::core::Config;
use crate::db::DbService;
use crate::db::repository::user;

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc / 连接池实现浅拷贝，所有权成本极低。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | pool | SQLite 连接池 |
/// | jwt_service | JWT 认证服务 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// SQLite 连接池
    pub pool: SqlitePool,
    /// JWT 认证服务 (Arc 共享所有权)
    pub jwt_service: Arc<JwtService>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 1. 数据库连接 + 迁移
    /// 2. 保证超级管理员存在
    /// 3. JWT 服务
    ///
    /// # Panics
    ///
    /// 数据库初始化失败时 panic
    pub async fn initialize(config: &Config) -> Self {
        let db_service = DbService::new(&config.db_path)
            .await
            .expect("Failed to initialize database");
        let pool = db_service.pool;

        user::ensure_superuser(&pool)
            .await
            .expect("Failed to ensure superuser account");

        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));

        Self {
            config: config.clone(),
            pool,
            jwt_service,
        }
    }
}
