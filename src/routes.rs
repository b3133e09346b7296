//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::{auth::middleware::bearer_auth_middleware, handlers, middleware::AppState};

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new().route("/health", get(handlers::health::health_check));

    // 认证路由（无需认证）
    let auth_routes = Router::new().route("/auth/login", post(handlers::auth::login));

    // 需要认证的路由
    let authenticated_routes = Router::new()
        .route("/auth/me", get(handlers::auth::get_current_user))
        .route("/conversation/analyze", post(handlers::analysis::analyze_conversation))
        .route("/image/analyze", post(handlers::analysis::analyze_image))
        .route("/document/summarize", post(handlers::analysis::summarize_document))
        // route_layer 只作用于已匹配的路由，未知路径仍返回 404
        .route_layer(DefaultBodyLimit::max(state.config.server.max_upload_bytes))
        .route_layer(axum::middleware::from_fn_with_state(
            state.auth_gateway.clone(),
            bearer_auth_middleware,
        ));

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(authenticated_routes)
        .layer(cors_layer(&state.config.server.cors_allowed_origins))
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .with_state(state)
}

/// 构建 CORS 层
/// 列表中包含 "*" 时允许任意来源，此时不能携带凭证
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS allows any origin; credentials disabled");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}
