//! Permission Model
//!
//! 统一权限模型：菜单权限、API 操作权限、模块权限共用一张表，
//! 由 `permission_type` 区分，`code` 全局唯一。

use serde::{Deserialize, Serialize};

/// 权限类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PermissionType {
    /// 模块级权限 (顶层分组)
    Module,
    /// 功能/菜单权限
    Feature,
    /// API 操作权限
    Action,
}

/// HTTP 请求方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum MethodType {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl MethodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodType::Get => "GET",
            MethodType::Post => "POST",
            MethodType::Put => "PUT",
            MethodType::Delete => "DELETE",
            MethodType::Patch => "PATCH",
        }
    }
}

/// Permission entity (统一权限)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Permission {
    pub id: i64,
    pub name: String,
    /// 全局唯一权限代码，缺省时在首次持久化前自动生成
    pub code: String,
    pub description: Option<String>,
    pub permission_type: PermissionType,
    /// 父权限 ID (0 = 根)
    pub parent_id: i64,
    #[cfg_attr(feature = "db", sqlx(rename = "sort_order"))]
    pub order: i64,
    pub is_active: bool,

    // 菜单相关字段
    pub menu_path: Option<String>,
    pub menu_icon: Option<String>,
    pub menu_component: Option<String>,
    pub is_hidden: bool,

    // API 相关字段
    pub api_path: Option<String>,
    pub api_method: Option<MethodType>,

    pub created_at: i64,
    pub updated_at: i64,
}

/// Create permission payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionCreate {
    pub name: String,
    /// 省略时由 [`generate_code`](Permission::generate_code) 推导
    pub code: Option<String>,
    pub description: Option<String>,
    pub permission_type: PermissionType,
    #[serde(default)]
    pub parent_id: i64,
    #[serde(default)]
    pub order: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub menu_path: Option<String>,
    pub menu_icon: Option<String>,
    pub menu_component: Option<String>,
    #[serde(default)]
    pub is_hidden: bool,
    pub api_path: Option<String>,
    pub api_method: Option<MethodType>,
}

fn default_true() -> bool {
    true
}

/// Update permission payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub permission_type: Option<PermissionType>,
    pub parent_id: Option<i64>,
    pub order: Option<i64>,
    pub is_active: Option<bool>,
    pub menu_path: Option<String>,
    pub menu_icon: Option<String>,
    pub menu_component: Option<String>,
    pub is_hidden: Option<bool>,
    pub api_path: Option<String>,
    pub api_method: Option<MethodType>,
}

impl Permission {
    /// 自动生成权限代码
    ///
    /// 规则：
    /// - API权限：`api.{module}.{action}.{method}`
    /// - 菜单权限：`menu.{path}`
    /// - 模块权限：`module.{name}`
    ///
    /// 前三个分支对相同输入总是产生相同输出；兜底分支使用当前
    /// Unix 秒级时间戳，唯一性由数据库 UNIQUE 约束兜底。
    pub fn generate_code(
        permission_type: PermissionType,
        api_path: Option<&str>,
        api_method: Option<MethodType>,
        menu_path: Option<&str>,
        name: Option<&str>,
    ) -> String {
        if permission_type == PermissionType::Action
            && let (Some(path), Some(method)) = (api_path, api_method)
        {
            // API权限：api.user.list.get
            let parts: Vec<&str> = path.trim_matches('/').split('/').collect();
            // 移除 'api', 'v1' 等前缀
            let clean: Vec<&str> = parts
                .into_iter()
                .filter(|p| *p != "api" && *p != "v1")
                .collect();
            let method = method.as_str().to_lowercase();
            if clean.len() >= 2 {
                // clean[0] = user, role, menu 等; clean[1] = list, create, update 等
                return format!("api.{}.{}.{}", clean[0], clean[1], method);
            }
            return format!("api.{}.{}", clean.join("."), method);
        }

        if matches!(
            permission_type,
            PermissionType::Feature | PermissionType::Action
        ) && let Some(path) = menu_path
        {
            // 菜单权限：menu.users, menu.roles
            return format!("menu.{}", path.trim_matches('/'));
        }

        if permission_type == PermissionType::Module
            && let Some(name) = name
        {
            // 模块权限：module.system
            let cleaned = name.replace(' ', "").replace("管理", "").to_lowercase();
            let mapped = match cleaned.as_str() {
                "系统" => "system",
                "用户" => "user",
                "角色" => "role",
                "菜单" => "menu",
                "权限" => "permission",
                "api" => "api",
                "部门" => "dept",
                "审计日志" => "audit",
                other => other,
            };
            return format!("module.{}", mapped);
        }

        // 默认情况：使用时间戳，碰撞由 code 的 UNIQUE 约束暴露给调用方
        format!("perm.{}", crate::util::now_secs())
    }
}
