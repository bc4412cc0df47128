//! Audit Log Model
//!
//! Append-mostly：除批量软删除外不做任何修改。

use serde::{Deserialize, Serialize};

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct AuditLog {
    pub id: i64,
    pub user_id: i64,
    /// 用户名快照 (用户改名后日志不变)
    pub username: String,
    /// 功能模块
    pub module: String,
    /// 请求描述
    pub summary: String,
    pub method: String,
    pub path: String,
    /// HTTP 状态码 (-1 = 未知)
    pub status: i64,
    /// 响应时间 (ms)
    pub response_time: i64,
    pub request_args: Option<serde_json::Value>,
    pub response_body: Option<serde_json::Value>,
    pub ip_address: String,
    pub user_agent: String,
    pub operation_type: String,
    pub log_level: String,
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Append payload for the audit pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogCreate {
    pub user_id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_status")]
    pub status: i64,
    #[serde(default)]
    pub response_time: i64,
    pub request_args: Option<serde_json::Value>,
    pub response_body: Option<serde_json::Value>,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub operation_type: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_status() -> i64 {
    -1
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Batch soft-delete payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogBatchDelete {
    pub ids: Vec<i64>,
}
