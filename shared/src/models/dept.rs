//! Department Model
//!
//! 部门树用闭包表 (`DeptClosure`) 表示：每个可达的 (祖先, 后代) 对
//! 存一行，level 为路径长度，自引用行 level = 0。

use serde::{Deserialize, Serialize};

/// Department entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Dept {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_deleted: bool,
    #[cfg_attr(feature = "db", sqlx(rename = "sort_order"))]
    pub order: i64,
    /// 父部门 ID (0 = 根)
    pub parent_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Closure-table row: `ancestor` reaches `descendant` in `level` steps
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct DeptClosure {
    pub id: i64,
    pub ancestor: i64,
    pub descendant: i64,
    pub level: i64,
}

/// Create department payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeptCreate {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub parent_id: i64,
}

/// Update department payload (`parent_id` triggers a re-parent)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeptUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub order: Option<i64>,
    pub parent_id: Option<i64>,
}
