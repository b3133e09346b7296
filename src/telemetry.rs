//! 日志与追踪系统
//! 结构化日志输出，格式与级别来自配置

use crate::{config::LoggingConfig, error::AppError};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// HTTP 客户端与模型调用的底层依赖默认只输出警告
const QUIET_DEPENDENCIES: &[&str] = &[
    "hyper=warn",
    "hyper_util=warn",
    "reqwest=warn",
    "h2=warn",
    "rustls=warn",
];

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 单行 JSON（生产环境，便于采集）
    Json,
    /// 多行彩色输出（本地开发）
    Pretty,
    /// 单行文本
    Compact,
}

impl LogFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// 构建过滤器：设置了 RUST_LOG 时以其为准
fn build_filter(level: &str, rust_log: Option<&str>) -> Result<EnvFilter, AppError> {
    if let Some(directives) = rust_log.filter(|s| !s.trim().is_empty()) {
        return EnvFilter::try_new(directives)
            .map_err(|e| AppError::Config(format!("Invalid RUST_LOG: {}", e)));
    }

    let directives = std::iter::once(level)
        .chain(QUIET_DEPENDENCIES.iter().copied())
        .collect::<Vec<_>>()
        .join(",");

    EnvFilter::try_new(directives).map_err(|e| AppError::Config(format!("Invalid log level: {}", e)))
}

/// 初始化全局日志订阅者（进程内只能成功一次）
pub fn init_telemetry(config: &LoggingConfig) -> Result<(), AppError> {
    let format = LogFormat::parse(&config.format)
        .ok_or_else(|| AppError::Config(format!("Invalid log format: {}", config.format)))?;
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = build_filter(&config.level, rust_log.as_deref())?;

    let log_layer = match format {
        // 请求 span 关闭时输出耗时，与 request_id 一起落入 JSON
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(false)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(false)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(log_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to install log subscriber: {}", e)))?;

    tracing::debug!(?format, level = %config.level, "Logging initialized");
    Ok(())
}
