//! 配置系统
//! 从环境变量加载所有配置，使用 Secret 包装敏感信息

use crate::telemetry::LogFormat;
use config::{Config, ConfigError, Environment};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

/// 未设置 JWT 密钥时的开发环境默认值（生产环境禁止使用）
pub const DEV_FALLBACK_JWT_SECRET: &str = "your-super-secret-key-change-in-production";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址，例如 "0.0.0.0:8000"
    pub addr: String,
    /// 优雅关闭超时时间（秒）
    pub graceful_shutdown_timeout_secs: u64,
    /// 允许的 CORS 来源，包含 "*" 时允许任意来源（不携带凭证）
    pub cors_allowed_origins: Vec<String>,
    /// 上传文件大小上限（字节）
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// JWT 密钥（使用 Secret 包装，防止日志泄露）
    pub jwt_secret: Option<Secret<String>>,
    /// 访问令牌过期时间（分钟）
    pub access_token_expire_minutes: u64,
    /// bcrypt 工作因子
    pub bcrypt_cost: u32,
    /// 新密码哈希算法: bcrypt, argon2id
    pub password_scheme: String,
}

impl SecurityConfig {
    /// 实际用于签名的密钥，未配置时回退到开发默认值
    pub fn signing_secret(&self) -> &str {
        self.jwt_secret
            .as_ref()
            .map(|s| s.expose_secret().as_str())
            .unwrap_or(DEV_FALLBACK_JWT_SECRET)
    }

    /// 是否正在使用开发默认密钥
    pub fn uses_fallback_secret(&self) -> bool {
        self.signing_secret() == DEV_FALLBACK_JWT_SECRET
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenAiConfig {
    /// 生成式模型 API Key
    pub api_key: Option<Secret<String>>,
    /// API 基础地址
    pub base_url: String,
    /// 模型名称
    pub model: String,
    /// 模型请求超时（秒）
    pub request_timeout_secs: u64,
    /// 提交给模型的文本最大字符数
    pub max_prompt_chars: usize,
    /// 抓取 URL 内容的超时（秒）
    pub url_fetch_timeout_secs: u64,
    /// URL 内容声明长度上限（字节），超过则直接拒绝
    pub max_fetch_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// 运行环境: development, production
    pub environment: String,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub genai: GenAiConfig,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        // 添加默认配置
        settings = settings
            .set_default("environment", "development")?
            .set_default("server.addr", "0.0.0.0:8000")?
            .set_default("server.graceful_shutdown_timeout_secs", 30)?
            .set_default(
                "server.cors_allowed_origins",
                vec![
                    "http://localhost:5173",
                    "http://127.0.0.1:5173",
                    "http://localhost:3000",
                    "http://127.0.0.1:3000",
                ],
            )?
            .set_default("server.max_upload_bytes", 25 * 1024 * 1024)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("security.access_token_expire_minutes", 30)?
            .set_default("security.bcrypt_cost", i64::from(bcrypt::DEFAULT_COST))?
            .set_default("security.password_scheme", "bcrypt")?
            .set_default("genai.base_url", "https://generativelanguage.googleapis.com")?
            .set_default("genai.model", "gemini-1.5-flash")?
            .set_default("genai.request_timeout_secs", 60)?
            .set_default("genai.max_prompt_chars", 8000)?
            .set_default("genai.url_fetch_timeout_secs", 10)?
            .set_default("genai.max_fetch_bytes", 5 * 1024 * 1024)?;

        // 从环境变量加载配置（前缀为 PLAYGROUND_）
        settings = settings.add_source(
            Environment::with_prefix("PLAYGROUND")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.cors_allowed_origins")
                .try_parsing(true),
        );

        // 兼容旧的扁平环境变量
        settings = settings
            .set_override_option("security.jwt_secret", non_empty_env("JWT_SECRET"))?
            .set_override_option(
                "security.access_token_expire_minutes",
                non_empty_env("ACCESS_TOKEN_EXPIRE_MINUTES"),
            )?
            .set_override_option("genai.api_key", non_empty_env("GEMINI_API_KEY"))?;

        let config: AppConfig = settings.build()?.try_deserialize()?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// 验证配置合法性
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.environment.to_lowercase().as_str() {
            "development" | "production" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid environment: {}. Must be one of: development, production",
                    self.environment
                )))
            }
        }

        // 验证端口范围
        if let Some(port_str) = self.server.addr.split(':').next_back() {
            if let Ok(port) = port_str.parse::<u16>() {
                if port < 1024 {
                    return Err(ConfigError::Message("Server port should be >= 1024".to_string()));
                }
            }
        }

        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Message("max_upload_bytes must be > 0".to_string()));
        }

        // 验证日志级别
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        // 验证日志格式
        if LogFormat::parse(&self.logging.format).is_none() {
            return Err(ConfigError::Message(format!(
                "Invalid log format: {}. Must be one of: json, pretty, compact",
                self.logging.format
            )));
        }

        // 生产环境必须显式配置足够强度的 JWT 密钥
        if self.is_production() {
            if self.security.jwt_secret.is_none() || self.security.uses_fallback_secret() {
                return Err(ConfigError::Message(
                    "JWT secret must be set explicitly in production".to_string(),
                ));
            }
            if self.security.signing_secret().len() < 32 {
                return Err(ConfigError::Message(
                    "JWT secret must be at least 32 characters long".to_string(),
                ));
            }
        }

        // 验证令牌过期时间
        if self.security.access_token_expire_minutes < 1
            || self.security.access_token_expire_minutes > 1440
        {
            return Err(ConfigError::Message(
                "access_token_expire_minutes must be between 1 and 1440 (1 minute to 24 hours)"
                    .to_string(),
            ));
        }

        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::Message("bcrypt_cost must be between 4 and 31".to_string()));
        }

        match self.security.password_scheme.to_lowercase().as_str() {
            "bcrypt" | "argon2id" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid password scheme: {}. Must be one of: bcrypt, argon2id",
                    self.security.password_scheme
                )))
            }
        }

        if self.genai.max_prompt_chars == 0 {
            return Err(ConfigError::Message("max_prompt_chars must be > 0".to_string()));
        }

        if self.genai.max_fetch_bytes == 0 {
            return Err(ConfigError::Message("max_fetch_bytes must be > 0".to_string()));
        }

        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
