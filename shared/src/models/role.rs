//! Role Model

use serde::{Deserialize, Serialize};

/// Role entity (RBAC 角色)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create role payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleCreate {
    pub name: String,
    pub description: Option<String>,
}

/// Update role payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Replace a role's permission set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAuthorize {
    pub id: i64,
    pub permission_ids: Vec<i64>,
}
