//! 健康检查处理器

use axum::Json;
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::time::Instant;

/// 存活探针响应
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
}

/// 应用启动时间（在 main.rs 中设置）
static APP_START_TIME: OnceCell<Instant> = OnceCell::new();

/// 设置应用启动时间
pub fn set_start_time() {
    let _ = APP_START_TIME.set(Instant::now());
}

/// 获取应用运行时间（秒）
pub fn get_uptime() -> u64 {
    APP_START_TIME
        .get()
        .map_or(0, |start| start.elapsed().as_secs())
}

/// 存活探针，不检查依赖
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: get_uptime(),
    })
}
