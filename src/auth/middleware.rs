//! Bearer 认证中间件

use crate::{
    auth::gateway::{AuthGateway, Identity},
    error::AppError,
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// 认证上下文（附加到请求扩展，仅在本次请求内有效）
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub identity: Identity,
}

// 实现 FromRequestParts 以便在 handler 中直接提取 AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AppError::InvalidSession)
    }
}

/// 从 Authorization 头提取 Bearer 令牌（方案名不区分大小写）
pub fn extract_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or(AppError::InvalidSession)
}

/// Bearer 认证中间件 - 必须认证
pub async fn bearer_auth_middleware(
    State(gateway): State<Arc<AuthGateway>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(req.headers())?;

    let identity = gateway.authorize(&token)?;

    req.extensions_mut().insert(AuthContext { identity });

    Ok(next.run(req).await)
}
