//! API 路由模块
//!
//! # 结构
//!
//! - [`base`] - 登录与当前用户接口
//! - [`users`] - 用户管理接口
//! - [`roles`] - 角色管理接口
//! - [`permissions`] - 权限管理接口
//! - [`menus`] - 菜单管理接口
//! - [`apis`] - API 目录管理接口
//! - [`depts`] - 部门管理接口
//! - [`audit_log`] - 审计日志接口

pub mod apis;
pub mod audit_log;
pub mod base;
pub mod depts;
pub mod menus;
pub mod permissions;
pub mod roles;
pub mod users;

use serde::Deserialize;

// Re-export common types for handlers
pub use crate::utils::{AppResponse, AppResult};

/// 通用 `?id=` 查询参数
#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: i64,
}

pub(crate) fn default_page() -> i64 {
    1
}

pub(crate) fn default_page_size() -> i64 {
    10
}
