//! 测试公共模块
//! 提供测试配置、桩模型与请求构造辅助函数

#![allow(dead_code)]

use ai_playground::{
    auth::ManualClock,
    config::{AppConfig, GenAiConfig, LoggingConfig, SecurityConfig, ServerConfig},
    genai::{ContentPart, GenerativeModel, ModelError},
    middleware::AppState,
    routes,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use http_body_util::BodyExt;
use secrecy::Secret;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-key-for-testing-only-min-32-chars";
pub const MULTIPART_BOUNDARY: &str = "----playground-test-boundary";

/// 创建测试配置（低 bcrypt 成本以加快测试）
pub fn create_test_config() -> AppConfig {
    AppConfig {
        environment: "development".to_string(),
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(),
            graceful_shutdown_timeout_secs: 5,
            cors_allowed_origins: vec!["http://localhost:5173".to_string()],
            max_upload_bytes: 1024 * 1024,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            jwt_secret: Some(Secret::new(TEST_SECRET.to_string())),
            access_token_expire_minutes: 30,
            bcrypt_cost: 4,
            password_scheme: "bcrypt".to_string(),
        },
        genai: GenAiConfig {
            api_key: None,
            base_url: "http://127.0.0.1:9".to_string(),
            model: "test-model".to_string(),
            request_timeout_secs: 5,
            max_prompt_chars: 8000,
            url_fetch_timeout_secs: 5,
            max_fetch_bytes: 1024 * 1024,
        },
    }
}

/// 返回固定文本的生成式模型，并记录收到的提示
pub struct StubModel {
    reply: Result<String, ()>,
    pub calls: Mutex<Vec<Vec<ContentPart>>>,
}

impl StubModel {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Err(()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Vec<ContentPart> {
        self.calls.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl GenerativeModel for StubModel {
    async fn generate(&self, parts: Vec<ContentPart>) -> Result<String, ModelError> {
        self.calls.lock().unwrap().push(parts);
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(()) => Err(ModelError::EmptyResponse),
        }
    }
}

/// 测试应用：路由、可控时钟与桩模型
pub struct TestApp {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub model: Arc<StubModel>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_model(StubModel::replying("stub model reply"))
    }

    pub fn with_model(model: Arc<StubModel>) -> Self {
        let clock = Arc::new(ManualClock::starting_now());
        let state = AppState::build(create_test_config(), clock.clone(), model.clone())
            .expect("Failed to build test app state");

        Self {
            router: routes::create_router(state),
            clock,
            model,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// 使用内置账户登录并返回 access token
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self.send(login_request(username, password)).await;
        assert!(response.status().is_success(), "login failed for {}", username);

        let json = body_json(response).await;
        json["access_token"].as_str().unwrap().to_string()
    }
}

pub fn login_request(username: &str, password: &str) -> Request<Body> {
    let body = serde_json::json!({ "username": username, "password": password });

    Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_with_token(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// multipart 表单中的一个字段
pub enum Part<'a> {
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();

    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        match part {
            Part::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(uri: &str, token: Option<&str>, parts: &[Part<'_>]) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
    );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
