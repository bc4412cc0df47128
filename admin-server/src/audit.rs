//! 审计日志中间件
//!
//! 记录所有已认证的变更请求 (POST/PUT/DELETE/PATCH)：模块、描述、
//! 状态码、响应耗时、请求/响应负载、IP 与 UA。写入失败只记录错误
//! 日志，不影响业务响应。

use std::time::Instant;

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http::Method;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::audit_log;
use crate::routes;
use shared::models::AuditLogCreate;

/// 超过该大小的负载不入库 (仍原样转发)
const MAX_CAPTURED_BODY: usize = 64 * 1024;

pub async fn record_mutations(
    State(state): State<ServerState>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let is_mutation = method == Method::POST
        || method == Method::PUT
        || method == Method::DELETE
        || method == Method::PATCH;
    // 登录接口由 login handler 自己记录 (带成功/失败语义)
    if !is_mutation || !path.starts_with("/api/v1/") || path == "/api/v1/base/access_token" {
        return next.run(req).await;
    }

    let user = req.extensions().get::<CurrentUser>().cloned();
    let ip_address = client_ip(&req);
    let user_agent = req
        .headers()
        .get(http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let start = Instant::now();

    // 缓冲请求体以便入库，然后原样转发
    let (parts, body) = req.into_parts();
    let request_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => return next.run(Request::from_parts(parts, Body::empty())).await,
    };
    let request_args = capture_json(&request_bytes).map(redact_sensitive);
    let req = Request::from_parts(parts, Body::from(request_bytes));

    let response = next.run(req).await;

    let response_time = start.elapsed().as_millis() as i64;
    let status = response.status().as_u16() as i64;

    let (parts, body) = response.into_parts();
    let response_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();
    let response_body = capture_json(&response_bytes);
    let response = Response::from_parts(parts, Body::from(response_bytes));

    let (module, summary) = routes::describe(&method, &path);
    let entry = AuditLogCreate {
        user_id: user.as_ref().map(|u| u.id).unwrap_or(-1),
        username: user.map(|u| u.username).unwrap_or_default(),
        module,
        summary,
        method: method.to_string(),
        path: path.clone(),
        status,
        response_time,
        request_args,
        response_body,
        ip_address,
        user_agent,
        operation_type: operation_type(&method, &path),
        log_level: log_level_for(status).to_string(),
    };

    if let Err(e) = audit_log::append(&state.pool, entry).await {
        tracing::error!(path = %path, error = %e, "Failed to append audit log");
    }

    response
}

/// 代理头里的客户端地址 (x-forwarded-for 第一跳优先)
fn client_ip(req: &Request) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| {
            req.headers()
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
        })
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// 仅捕获有界大小的 JSON 负载
fn capture_json(bytes: &[u8]) -> Option<serde_json::Value> {
    if bytes.is_empty() || bytes.len() > MAX_CAPTURED_BODY {
        return None;
    }
    serde_json::from_slice(bytes).ok()
}

/// 口令等敏感字段入库前打码
fn redact_sensitive(mut value: serde_json::Value) -> serde_json::Value {
    if let serde_json::Value::Object(ref mut map) = value {
        for (key, v) in map.iter_mut() {
            if key.contains("password") {
                *v = serde_json::Value::String("***".to_string());
            }
        }
    }
    value
}

/// 操作类型：取路径末段动词，退化为小写方法名
fn operation_type(method: &Method, path: &str) -> String {
    match path.trim_end_matches('/').rsplit('/').next() {
        Some(seg)
            if !seg.is_empty()
                && seg.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                && !seg.chars().all(|c| c.is_ascii_digit()) =>
        {
            seg.to_string()
        }
        _ => method.as_str().to_lowercase(),
    }
}

fn log_level_for(status: i64) -> &'static str {
    if status >= 500 {
        "error"
    } else if status >= 400 {
        "warning"
    } else {
        "info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_type_from_path() {
        assert_eq!(
            operation_type(&Method::POST, "/api/v1/user/create"),
            "create"
        );
        assert_eq!(
            operation_type(&Method::DELETE, "/api/v1/auditlog/batch_delete"),
            "batch_delete"
        );
        // 纯数字末段退化为方法名
        assert_eq!(operation_type(&Method::POST, "/api/v1/user/123"), "post");
    }

    #[test]
    fn redact_hides_passwords() {
        let value = serde_json::json!({
            "username": "alice",
            "password": "secret",
            "old_password": "secret2"
        });
        let redacted = redact_sensitive(value);
        assert_eq!(redacted["username"], "alice");
        assert_eq!(redacted["password"], "***");
        assert_eq!(redacted["old_password"], "***");
    }

    #[test]
    fn capture_rejects_oversized_and_non_json() {
        assert!(capture_json(b"not json").is_none());
        assert!(capture_json(&[]).is_none());
        let big = vec![b'a'; MAX_CAPTURED_BODY + 1];
        assert!(capture_json(&big).is_none());
        assert!(capture_json(b"{\"a\":1}").is_some());
    }
}
