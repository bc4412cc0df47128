//! 认证中间件
//!
//! 为 JWT 认证和授权提供 Axum 中间件。

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::{CurrentUser, JwtService};
use crate::core::ServerState;
use crate::utils::AppError;
use shared::models::{MethodType, Permission, PermissionType};

/// 无需令牌即可访问的路径
const PUBLIC_PATHS: &[&str] = &["/api/v1/base/access_token"];

/// 认证中间件 - 要求用户登录
///
/// 从 `Authorization: Bearer <token>` 头提取并验证 JWT。
/// 验证成功后将 [`CurrentUser`] 注入请求扩展。
///
/// # 跳过认证的路径
///
/// - `OPTIONS *` (CORS 预检)
/// - 非 `/api/` 路径 (健康检查等，正常返回 404)
/// - [`PUBLIC_PATHS`] (登录接口)
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req.uri().path();

    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    if !path.starts_with("/api/") || PUBLIC_PATHS.contains(&path) {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) => JwtService::extract_from_header(header)
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
        None => {
            tracing::warn!(target: "security", uri = %req.uri(), "Missing authorization header");
            return Err(AppError::unauthorized());
        }
    };

    match state.jwt_service.validate_token(token) {
        Ok(claims) => {
            let user = CurrentUser::from(claims);
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
        Err(e) => {
            tracing::warn!(
                target: "security",
                error = %e,
                uri = %req.uri(),
                "Token validation failed"
            );
            match e {
                crate::auth::JwtError::ExpiredToken => Err(AppError::token_expired()),
                _ => Err(AppError::invalid_token("Invalid token")),
            }
        }
    }
}

/// 授权中间件 - 按路由推导所需权限代码
///
/// 所需代码直接用权限代码生成器从 method + path 推导，与持久化的
/// ACTION 权限代码一一对应 (如 `GET /api/v1/user/list` →
/// `api.user.list.get`)。`/api/v1/base/*` 只要求登录。
pub async fn authorize(req: Request, next: Next) -> Result<Response, AppError> {
    let path = req.uri().path().to_string();

    if req.method() == http::Method::OPTIONS || !path.starts_with("/api/") {
        return Ok(next.run(req).await);
    }

    // 基础接口 (登录态即可) 与公开接口
    if path.starts_with("/api/v1/base/") {
        return Ok(next.run(req).await);
    }

    let Some(user) = req.extensions().get::<CurrentUser>() else {
        return Err(AppError::unauthorized());
    };

    let method = req.method();
    let method = if method == http::Method::GET {
        MethodType::Get
    } else if method == http::Method::POST {
        MethodType::Post
    } else if method == http::Method::PUT {
        MethodType::Put
    } else if method == http::Method::DELETE {
        MethodType::Delete
    } else if method == http::Method::PATCH {
        MethodType::Patch
    } else {
        return Ok(next.run(req).await);
    };

    let code =
        Permission::generate_code(PermissionType::Action, Some(&path), Some(method), None, None);

    if !user.has_permission(&code) {
        tracing::warn!(
            target: "security",
            user_id = user.id,
            username = %user.username,
            required = %code,
            "Permission denied"
        );
        return Err(AppError::forbidden(format!("Permission denied: {}", code)));
    }

    Ok(next.run(req).await)
}
