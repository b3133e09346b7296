//! AI Playground API 主入口

use ai_playground::{
    auth::SystemClock,
    config::AppConfig,
    genai::GeminiClient,
    handlers::health,
    middleware::AppState,
    routes, telemetry,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ===== CLI 参数处理 =====
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--version" => {
                println!("ai-playground-api {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("未知参数: {}", args[1]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    // 加载 .env 文件（开发环境）
    // 按优先级加载：.env.local > .env.development > .env
    // 生产环境应该直接设置环境变量，不依赖 .env 文件
    if let Ok(env) = std::env::var("PLAYGROUND_ENV_FILE") {
        dotenv::from_filename(format!(".env.{}", env)).ok();
    } else {
        dotenv::from_filename(".env.local").ok();
        dotenv::from_filename(".env.development").ok();
        dotenv::dotenv().ok();
    }

    health::set_start_time();

    // 1. 加载配置（生产环境缺少密钥时在此失败）
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    // 2. 初始化日志
    telemetry::init_telemetry(&config.logging)?;

    if config.security.uses_fallback_secret() {
        tracing::warn!(
            "JWT_SECRET not set; using the insecure development default. Never deploy like this."
        );
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        "AI Playground API starting..."
    );

    // 3. 构建应用状态
    let model = Arc::new(GeminiClient::from_config(&config.genai)?);
    let app_state = AppState::build(config.clone(), Arc::new(SystemClock), model)?;

    // 4. 构建路由
    let app = routes::create_router(app_state);

    // 5. 启动服务器
    let addr = &config.server.addr;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(addr = %addr, "Server listening");

    // 6. 优雅关闭
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.graceful_shutdown_timeout_secs))
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
/// 收到信号后开始关闭，超时仍未完成则强制退出
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, starting graceful shutdown");
        },
    }

    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(timeout_secs)).await;
        tracing::warn!("Graceful shutdown timeout reached, forcing exit");
        std::process::exit(1);
    });
}

/// 打印帮助信息
fn print_help() {
    println!("ai-playground-api {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("用法: ai-playground-api [选项]");
    println!();
    println!("选项:");
    println!("  --version     打印版本信息并退出");
    println!("  --help        打印此帮助信息并退出");
    println!();
    println!("环境变量:");
    println!("  JWT_SECRET                   令牌签名密钥（生产环境必填）");
    println!("  ACCESS_TOKEN_EXPIRE_MINUTES  令牌有效期（分钟，默认 30）");
    println!("  GEMINI_API_KEY               生成式模型 API Key");
    println!("  其余选项请参考 .env.example（前缀 PLAYGROUND_）");
}
