//! Api Model
//!
//! 后端可寻址操作的目录条目。ACTION 权限在概念上引用它，但不建外键。

use serde::{Deserialize, Serialize};

use super::MethodType;

/// Api catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Api {
    pub id: i64,
    pub path: String,
    pub method: MethodType,
    pub summary: String,
    pub tags: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create api payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCreate {
    pub path: String,
    pub method: MethodType,
    pub summary: String,
    #[serde(default)]
    pub tags: String,
}

/// Update api payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiUpdate {
    pub path: Option<String>,
    pub method: Option<MethodType>,
    pub summary: Option<String>,
    pub tags: Option<String>,
}
