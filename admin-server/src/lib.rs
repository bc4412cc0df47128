//! Admin Server - RBAC 管理后台
//!
//! # 架构概述
//!
//! 本模块是管理后台的主入口，提供以下核心功能：
//!
//! - **身份模型** (`db/repository`): 用户/角色/权限 + 显式关联表
//! - **权限代码** (`shared::models::Permission`): 由类型和上下文确定性推导
//! - **部门树** (`db/repository/dept`): 闭包表维护，O(1) 祖先查询
//! - **审计日志** (`audit`, `db/repository/audit_log`): 变更全量留痕
//! - **认证** (`auth`): JWT + Argon2 认证体系
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! admin-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── auth/          # JWT 认证、口令哈希、授权中间件
//! ├── api/           # HTTP 路由和处理器
//! ├── audit.rs       # 审计记录中间件
//! ├── db/            # 连接池、查询引擎、仓储
//! ├── routes.rs      # 路由装配 + 路由目录
//! └── utils/         # 错误、日志、时间工具
//! ```

pub mod api;
pub mod audit;
pub mod auth;
pub mod core;
pub mod db;
pub mod routes;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use utils::{AppError, AppResponse, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境 (dotenv + 日志)
pub fn setup_environment() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    utils::logger::init_logger_with_file(log_level.as_deref(), log_dir.as_deref());

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ___       __          _
   /   | ____/ /___ ___  (_)___
  / /| |/ __  / __ `__ \/ / __ \
 / ___ / /_/ / / / / / / / / / /
/_/  |_\__,_/_/ /_/ /_/_/_/ /_/
   _____
  / ___/___  ______   _____  _____
  \__ \/ _ \/ ___/ | / / _ \/ ___/
 ___/ /  __/ /   | |/ /  __/ /
/____/\___/_/    |___/\___/_/
    "#
    );
}
