//! 路由装配
//!
//! 把各 API 模块的路由合并到 `/api/v1` 下，并套上认证/授权/审计
//! 中间件。[`route_catalog`] 是同一张路由表的目录视图，供
//! `/api/v1/api/refresh` 对账和审计中间件取模块/描述。

use axum::{Json, Router, middleware as axum_middleware, routing::get};
use http::Method;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::core::ServerState;
use shared::models::{ApiCreate, MethodType};

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    let v1 = Router::new()
        .merge(api::base::router())
        .merge(api::users::router())
        .merge(api::roles::router())
        .merge(api::permissions::router())
        .merge(api::menus::router())
        .merge(api::apis::router())
        .merge(api::depts::router())
        .merge(api::audit_log::router());

    Router::new()
        // Health - public route
        .route("/health", get(health))
        .nest("/api/v1", v1)
}

/// Build a fully configured application with all middleware and state
pub fn build_app(state: ServerState) -> Router {
    build_router()
        // 审计记录 (最靠近 handler，拿到最终状态码/耗时)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            crate::audit::record_mutations,
        ))
        // 授权：按路由推导权限代码
        .layer(axum_middleware::from_fn(crate::auth::authorize))
        // 认证：注入 CurrentUser
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_auth,
        ))
        // Trace - Request tracing (logs at INFO level)
        .layer(TraceLayer::new_for_http())
        // CORS - Handle cross-origin requests
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 简单健康检查
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// 受管路由目录：path / method / summary / tags(模块)
///
/// `/base/*` 不在目录里 (登录态即可访问，不对应 ACTION 权限)。
pub fn route_catalog() -> Vec<ApiCreate> {
    fn entry(path: &str, method: MethodType, summary: &str, tags: &str) -> ApiCreate {
        ApiCreate {
            path: path.to_string(),
            method,
            summary: summary.to_string(),
            tags: tags.to_string(),
        }
    }

    vec![
        // 用户管理
        entry("/api/v1/user/list", MethodType::Get, "List users", "user"),
        entry("/api/v1/user/get", MethodType::Get, "Get user by id", "user"),
        entry("/api/v1/user/create", MethodType::Post, "Create user", "user"),
        entry("/api/v1/user/update", MethodType::Post, "Update user", "user"),
        entry("/api/v1/user/delete", MethodType::Delete, "Delete user", "user"),
        entry(
            "/api/v1/user/reset_password",
            MethodType::Post,
            "Reset user password",
            "user",
        ),
        // 角色管理
        entry("/api/v1/role/list", MethodType::Get, "List roles", "role"),
        entry("/api/v1/role/create", MethodType::Post, "Create role", "role"),
        entry("/api/v1/role/update", MethodType::Post, "Update role", "role"),
        entry("/api/v1/role/delete", MethodType::Delete, "Delete role", "role"),
        entry(
            "/api/v1/role/authorized",
            MethodType::Get,
            "Get role permissions",
            "role",
        ),
        entry(
            "/api/v1/role/authorized",
            MethodType::Post,
            "Update role permissions",
            "role",
        ),
        // 权限管理
        entry(
            "/api/v1/permission/list",
            MethodType::Get,
            "List permissions",
            "permission",
        ),
        entry(
            "/api/v1/permission/get",
            MethodType::Get,
            "Get permission by id",
            "permission",
        ),
        entry(
            "/api/v1/permission/create",
            MethodType::Post,
            "Create permission",
            "permission",
        ),
        entry(
            "/api/v1/permission/update",
            MethodType::Post,
            "Update permission",
            "permission",
        ),
        entry(
            "/api/v1/permission/delete",
            MethodType::Delete,
            "Delete permission",
            "permission",
        ),
        // 菜单管理
        entry("/api/v1/menu/list", MethodType::Get, "List menus", "menu"),
        entry("/api/v1/menu/create", MethodType::Post, "Create menu", "menu"),
        entry("/api/v1/menu/update", MethodType::Post, "Update menu", "menu"),
        entry("/api/v1/menu/delete", MethodType::Delete, "Delete menu", "menu"),
        // API 目录
        entry("/api/v1/api/list", MethodType::Get, "List apis", "api"),
        entry("/api/v1/api/create", MethodType::Post, "Create api", "api"),
        entry("/api/v1/api/update", MethodType::Post, "Update api", "api"),
        entry("/api/v1/api/delete", MethodType::Delete, "Delete api", "api"),
        entry(
            "/api/v1/api/refresh",
            MethodType::Post,
            "Refresh api catalog",
            "api",
        ),
        // 部门管理
        entry("/api/v1/dept/list", MethodType::Get, "List departments", "dept"),
        entry("/api/v1/dept/get", MethodType::Get, "Get department by id", "dept"),
        entry(
            "/api/v1/dept/create",
            MethodType::Post,
            "Create department",
            "dept",
        ),
        entry(
            "/api/v1/dept/update",
            MethodType::Post,
            "Update department",
            "dept",
        ),
        entry(
            "/api/v1/dept/delete",
            MethodType::Delete,
            "Delete department",
            "dept",
        ),
        // 审计日志
        entry(
            "/api/v1/auditlog/list",
            MethodType::Get,
            "List audit logs",
            "auditlog",
        ),
        entry(
            "/api/v1/auditlog/statistics",
            MethodType::Get,
            "Audit log statistics",
            "auditlog",
        ),
        entry(
            "/api/v1/auditlog/batch_delete",
            MethodType::Delete,
            "Batch delete audit logs",
            "auditlog",
        ),
    ]
}

/// 审计用：按 method + path 查 (模块, 描述)
pub fn describe(method: &Method, path: &str) -> (String, String) {
    let method_type = if *method == Method::GET {
        Some(MethodType::Get)
    } else if *method == Method::POST {
        Some(MethodType::Post)
    } else if *method == Method::PUT {
        Some(MethodType::Put)
    } else if *method == Method::DELETE {
        Some(MethodType::Delete)
    } else if *method == Method::PATCH {
        Some(MethodType::Patch)
    } else {
        None
    };
    if let Some(method_type) = method_type
        && let Some(entry) = route_catalog()
            .into_iter()
            .find(|e| e.path == path && e.method == method_type)
    {
        return (entry.tags, entry.summary);
    }
    (String::new(), format!("{} {}", method, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{Permission, PermissionType};

    #[test]
    fn catalog_codes_are_unique_and_derivable() {
        let catalog = route_catalog();
        let mut codes: Vec<String> = catalog
            .iter()
            .map(|e| {
                Permission::generate_code(
                    PermissionType::Action,
                    Some(&e.path),
                    Some(e.method),
                    None,
                    None,
                )
            })
            .collect();
        codes.sort();
        let before = codes.len();
        codes.dedup();
        // 每条受管路由映射到唯一的 ACTION 权限代码
        assert_eq!(before, codes.len());
        assert!(codes.iter().all(|c| c.starts_with("api.")));
    }

    #[test]
    fn describe_finds_known_routes() {
        let (module, summary) = describe(&Method::POST, "/api/v1/user/create");
        assert_eq!(module, "user");
        assert_eq!(summary, "Create user");

        let (module, _) = describe(&Method::GET, "/api/v1/nope");
        assert!(module.is_empty());
    }
}
