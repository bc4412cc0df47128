//! Base API Handlers
//!
//! 登录、当前用户信息、用户菜单/接口权限、改密。

use axum::Json;
use axum::extract::{Extension, State};
use serde::Serialize;

use crate::auth::{CurrentUser, password};
use crate::core::ServerState;
use crate::db::repository::{audit_log, permission, user};
use crate::utils::{AppError, AppResult};
use shared::models::{
    AuditLogCreate, LoginCredentials, PasswordUpdate, Permission, PermissionType, UserResponse,
};

/// 登录响应
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub username: String,
}

/// POST /api/v1/base/access_token - 登录换取令牌
pub async fn login(
    State(state): State<ServerState>,
    Json(credentials): Json<LoginCredentials>,
) -> AppResult<Json<LoginResponse>> {
    let user_row = user::find_by_username(&state.pool, &credentials.username).await?;

    let Some(user_row) = user_row else {
        record_login(&state, -1, &credentials.username, 401).await;
        return Err(AppError::invalid_credentials());
    };

    let verified = password::verify_password(&credentials.password, &user_row.password)
        .map_err(|e| AppError::internal(format!("Password verification failed: {e}")))?;
    if !verified || !user_row.is_active {
        record_login(&state, user_row.id, &user_row.username, 401).await;
        return Err(AppError::invalid_credentials());
    }

    user::set_last_login(&state.pool, user_row.id).await?;

    // 角色→权限展开进入令牌；超级管理员由 is_superuser 兜底
    let codes: Vec<String> = if user_row.is_superuser {
        vec![]
    } else {
        user::permissions_of(&state.pool, user_row.id)
            .await?
            .into_iter()
            .map(|p| p.code)
            .collect()
    };

    let token = state
        .jwt_service
        .generate_token(user_row.id, &user_row.username, user_row.is_superuser, &codes)
        .map_err(|e| AppError::internal(format!("Token generation failed: {e}")))?;

    tracing::info!(user_id = user_row.id, username = %user_row.username, "User logged in");
    record_login(&state, user_row.id, &user_row.username, 200).await;

    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        username: user_row.username,
    }))
}

/// 登录尝试也计入审计 (成功与失败)
async fn record_login(state: &ServerState, user_id: i64, username: &str, status: i64) {
    let entry = AuditLogCreate {
        user_id,
        username: username.to_string(),
        module: "base".to_string(),
        summary: "login".to_string(),
        method: "POST".to_string(),
        path: "/api/v1/base/access_token".to_string(),
        status,
        response_time: 0,
        request_args: None,
        response_body: None,
        ip_address: String::new(),
        user_agent: String::new(),
        operation_type: "login".to_string(),
        log_level: if status == 200 { "info" } else { "warning" }.to_string(),
    };
    if let Err(e) = audit_log::append(&state.pool, entry).await {
        tracing::error!(error = %e, "Failed to append login audit log");
    }
}

/// GET /api/v1/base/userinfo - 当前用户信息
pub async fn userinfo(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<UserResponse>> {
    let user_row = user::find_by_id(&state.pool, current_user.id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {} not found", current_user.id)))?;
    let role_ids = user::role_ids_of(&state.pool, user_row.id).await?;
    Ok(Json(UserResponse::from_user(user_row, role_ids)))
}

/// 菜单树节点
#[derive(Debug, Serialize)]
pub struct MenuNode {
    #[serde(flatten)]
    pub permission: Permission,
    pub children: Vec<MenuNode>,
}

/// 把带 menu_path 的权限组装为父子树
///
/// 根 = parent_id 为 0 或父节点不在集合内；兄弟按 order, id 排序。
fn build_menu_tree(mut permissions: Vec<Permission>) -> Vec<MenuNode> {
    permissions.sort_by_key(|p| (p.order, p.id));
    let ids: std::collections::HashSet<i64> = permissions.iter().map(|p| p.id).collect();

    fn attach(parent_id: i64, pool: &mut Vec<Permission>) -> Vec<MenuNode> {
        let (mine, rest): (Vec<Permission>, Vec<Permission>) =
            pool.drain(..).partition(|p| p.parent_id == parent_id);
        *pool = rest;
        mine.into_iter()
            .map(|p| {
                let id = p.id;
                let mut node = MenuNode {
                    permission: p,
                    children: Vec::new(),
                };
                node.children = attach(id, pool);
                node
            })
            .collect()
    }

    // 父节点缺失的权限提升为根，避免整棵子树丢失
    for p in permissions.iter_mut() {
        if p.parent_id != 0 && !ids.contains(&p.parent_id) {
            p.parent_id = 0;
        }
    }
    attach(0, &mut permissions)
}

/// GET /api/v1/base/usermenu - 当前用户可见的菜单树
///
/// 超级管理员看到全部启用菜单；其余用户按角色展开。
pub async fn usermenu(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<Vec<MenuNode>>> {
    let permissions = visible_permissions(&state, &current_user).await?;
    let menus: Vec<Permission> = permissions
        .into_iter()
        .filter(|p| {
            !p.is_hidden
                && matches!(
                    p.permission_type,
                    PermissionType::Module | PermissionType::Feature
                )
        })
        .collect();
    Ok(Json(build_menu_tree(menus)))
}

/// GET /api/v1/base/userapi - 当前用户的 API 权限代码
pub async fn userapi(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<Vec<String>>> {
    let permissions = visible_permissions(&state, &current_user).await?;
    let codes: Vec<String> = permissions
        .into_iter()
        .filter(|p| p.permission_type == PermissionType::Action)
        .map(|p| p.code)
        .collect();
    Ok(Json(codes))
}

async fn visible_permissions(
    state: &ServerState,
    current_user: &CurrentUser,
) -> AppResult<Vec<Permission>> {
    let permissions = if current_user.is_superuser {
        permission::all_active(&state.pool).await?
    } else {
        user::permissions_of(&state.pool, current_user.id).await?
    };
    Ok(permissions)
}

/// POST /api/v1/base/update_password - 自助改密
pub async fn update_password(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<PasswordUpdate>,
) -> AppResult<Json<bool>> {
    let user_row = user::find_by_id(&state.pool, current_user.id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {} not found", current_user.id)))?;

    let verified = password::verify_password(&payload.old_password, &user_row.password)
        .map_err(|e| AppError::internal(format!("Password verification failed: {e}")))?;
    if !verified {
        return Err(AppError::validation("Old password is incorrect"));
    }
    if payload.new_password.len() < 6 {
        return Err(AppError::validation(
            "New password must be at least 6 characters",
        ));
    }

    user::update_password(&state.pool, current_user.id, &payload.new_password).await?;
    tracing::info!(user_id = current_user.id, username = %current_user.username, "Password changed");
    Ok(Json(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(id: i64, parent_id: i64, order: i64, name: &str) -> Permission {
        Permission {
            id,
            name: name.to_string(),
            code: format!("menu.{name}"),
            description: None,
            permission_type: PermissionType::Feature,
            parent_id,
            order,
            is_active: true,
            menu_path: Some(format!("/{name}")),
            menu_icon: None,
            menu_component: None,
            is_hidden: false,
            api_path: None,
            api_method: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn tree_nests_children_under_parents() {
        let tree = build_menu_tree(vec![
            perm(1, 0, 1, "system"),
            perm(2, 1, 2, "users"),
            perm(3, 1, 1, "roles"),
            perm(4, 0, 2, "audit"),
        ]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].permission.name, "system");
        // siblings ordered by `order`
        assert_eq!(tree[0].children[0].permission.name, "roles");
        assert_eq!(tree[0].children[1].permission.name, "users");
        assert_eq!(tree[1].permission.name, "audit");
    }

    #[test]
    fn orphans_are_promoted_to_roots() {
        let tree = build_menu_tree(vec![perm(2, 99, 1, "lost")]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].permission.name, "lost");
    }

    #[test]
    fn empty_input_gives_empty_tree() {
        assert!(build_menu_tree(vec![]).is_empty());
    }
}
