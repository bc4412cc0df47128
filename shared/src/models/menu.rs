//! Menu Model

use serde::{Deserialize, Serialize};

/// 菜单类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MenuType {
    /// 目录 (只做分组，不可点击)
    Catalog,
    /// 菜单页
    Menu,
}

/// Menu entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Menu {
    pub id: i64,
    pub name: String,
    /// 保留字段 (前端自定义 JSON)
    pub remark: Option<serde_json::Value>,
    pub menu_type: Option<MenuType>,
    pub icon: Option<String>,
    pub path: String,
    #[cfg_attr(feature = "db", sqlx(rename = "sort_order"))]
    pub order: i64,
    /// 父菜单 ID (0 = 根)
    pub parent_id: i64,
    pub is_hidden: bool,
    pub component: String,
    pub keepalive: bool,
    pub redirect: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create menu payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuCreate {
    pub name: String,
    pub remark: Option<serde_json::Value>,
    pub menu_type: Option<MenuType>,
    pub icon: Option<String>,
    pub path: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub parent_id: i64,
    #[serde(default)]
    pub is_hidden: bool,
    pub component: String,
    #[serde(default = "default_true")]
    pub keepalive: bool,
    pub redirect: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Update menu payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MenuUpdate {
    pub name: Option<String>,
    pub remark: Option<serde_json::Value>,
    pub menu_type: Option<MenuType>,
    pub icon: Option<String>,
    pub path: Option<String>,
    pub order: Option<i64>,
    pub parent_id: Option<i64>,
    pub is_hidden: Option<bool>,
    pub component: Option<String>,
    pub keepalive: Option<bool>,
    pub redirect: Option<String>,
}
