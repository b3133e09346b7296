//! 认证相关的 HTTP 处理器

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::auth::{LoginRequest, LoginResponse, UserResponse},
};
use axum::{extract::State, Json};
use std::sync::Arc;

/// 登录
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    // 密码哈希校验是 CPU 密集操作，放到阻塞线程池执行
    let gateway = state.auth_gateway.clone();
    let outcome = tokio::task::spawn_blocking(move || gateway.login(&req.username, &req.password))
        .await
        .map_err(|e| AppError::Internal(format!("Login task failed: {}", e)))??;

    Ok(Json(LoginResponse::from(outcome)))
}

/// 获取当前用户信息
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<Json<UserResponse>, AppError> {
    // 账户在令牌有效期内被移除时视为会话失效
    let profile = state
        .auth_gateway
        .profile(&auth_context.identity.username)
        .ok_or(AppError::InvalidSession)?;

    Ok(Json(UserResponse::from(profile)))
}
