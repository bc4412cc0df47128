//! User Model

use serde::{Deserialize, Serialize};
use validator::Validate;

/// User entity (管理后台账号)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub username: String,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Argon2 hash, never leaves the server
    #[serde(skip_serializing, default)]
    pub password: String,
    pub is_active: bool,
    pub is_superuser: bool,
    /// 最后登录时间 (Unix millis)
    pub last_login: Option<i64>,
    pub dept_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// User response (without password, with assigned role ids)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub last_login: Option<i64>,
    pub dept_id: Option<i64>,
    pub role_ids: Vec<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl UserResponse {
    pub fn from_user(user: User, role_ids: Vec<i64>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            nickname: user.nickname,
            email: user.email,
            phone: user.phone,
            is_active: user.is_active,
            is_superuser: user.is_superuser,
            last_login: user.last_login,
            dept_id: user.dept_id,
            role_ids,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Create user payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UserCreate {
    #[validate(length(min = 1, max = 20))]
    pub username: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    pub nickname: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
    pub dept_id: Option<i64>,
    #[serde(default)]
    pub role_ids: Vec<i64>,
}

fn default_true() -> bool {
    true
}

/// Update user payload (password changes go through the password endpoints)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(length(min = 1, max = 20))]
    pub username: Option<String>,
    pub nickname: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
    pub dept_id: Option<i64>,
    /// 提供时整体替换用户的角色集合
    pub role_ids: Option<Vec<i64>>,
}

/// Login payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

/// Self-service password change payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordUpdate {
    pub old_password: String,
    pub new_password: String,
}

/// Admin password reset payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordReset {
    pub user_id: i64,
}
