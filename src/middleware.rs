//! HTTP 中间件
//! 应用状态与请求追踪

use crate::{
    auth::{AuthGateway, Clock, PasswordHasher, StaticCredentialStore, TokenCodec},
    config::AppConfig,
    error::AppError,
    genai::GenerativeModel,
    services::{ConversationService, DocumentService, ImageService},
};
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// 应用状态
///
/// 启动时构建一次，之后只读；服务使用 Arc 包装以便在请求间共享。
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub auth_gateway: Arc<AuthGateway>,
    pub conversation_service: Arc<ConversationService>,
    pub image_service: Arc<ImageService>,
    pub document_service: Arc<DocumentService>,
}

impl AppState {
    /// 根据配置装配所有服务
    ///
    /// 内置账户在此处完成哈希，bcrypt 工作因子越高启动越慢。
    pub fn build(
        config: AppConfig,
        clock: Arc<dyn Clock>,
        model: Arc<dyn GenerativeModel>,
    ) -> Result<Arc<Self>, AppError> {
        let hasher = PasswordHasher::from_config(&config.security)?;
        let store = StaticCredentialStore::with_builtin_accounts(&hasher)?;
        tracing::debug!(accounts = store.len(), "Credential store initialized");

        let tokens = TokenCodec::from_config(&config, clock)?;
        let auth_gateway = Arc::new(AuthGateway::new(Arc::new(store), hasher, tokens)?);

        let document_service = Arc::new(DocumentService::new(model.clone(), &config.genai)?);

        Ok(Arc::new(Self {
            auth_gateway,
            conversation_service: Arc::new(ConversationService::new(model.clone())),
            image_service: Arc::new(ImageService::new(model)),
            document_service,
            config,
        }))
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    async move {
        let start = Instant::now();

        let mut response = next.run(req).await;

        let elapsed = start.elapsed();
        let status = response.status().as_u16();

        metrics::counter!(
            "http_requests_total",
            "method" => method.clone(),
            "status" => status.to_string()
        )
        .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            method = %method,
            path = %path,
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        // 在响应头中回写 trace_id / request_id
        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
