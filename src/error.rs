//! 统一错误模型
//! 定义所有错误类型和错误响应格式

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// 登录失败（未知用户与密码错误对外不可区分）
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// 令牌缺失、无效或已过期
    #[error("Could not validate credentials")]
    InvalidSession,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::InvalidSession => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 获取用户友好的错误消息（不包含敏感信息）
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidCredentials => "Invalid credentials".to_string(),
            AppError::InvalidSession => "Could not validate credentials".to_string(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::PayloadTooLarge => "Payload too large".to_string(),
            AppError::Upstream(msg) => msg.clone(),
            AppError::Config(_) => "Configuration error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }
}

/// 错误响应 DTO
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 记录错误日志
        if status.is_server_error() {
            tracing::error!(code = self.code(), message = %self, "Application error");
        } else {
            tracing::debug!(code = self.code(), message = %self, "Request rejected");
        }

        let body = Json(ErrorResponse {
            detail: self.user_message(),
        });

        let mut response = (status, body).into_response();
        if matches!(self, AppError::InvalidSession) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}
