//! Generative model client
//! Gemini `generateContent` over HTTPS, behind the `GenerativeModel` trait

use crate::{config::GenAiConfig, error::AppError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// One piece of a multimodal prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    InlineData { mime_type: String, data: Vec<u8> },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn inline(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self::InlineData {
            mime_type: mime_type.into(),
            data,
        }
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("generative model API key is not configured")]
    NotConfigured,

    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("model returned no text")]
    EmptyResponse,
}

impl From<ModelError> for AppError {
    fn from(e: ModelError) -> Self {
        tracing::warn!(error = %e, "Generative model call failed");
        match e {
            ModelError::NotConfigured => {
                AppError::Upstream("Generative model is not configured".to_string())
            }
            _ => AppError::Upstream("Generative model request failed".to_string()),
        }
    }
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, parts: Vec<ContentPart>) -> Result<String, ModelError>;
}

// ===== Gemini wire format =====

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Serialize)]
struct RequestContent {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    Inline { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl From<ContentPart> for RequestPart {
    fn from(part: ContentPart) -> Self {
        match part {
            ContentPart::Text(text) => RequestPart::Text { text },
            ContentPart::InlineData { mime_type, data } => RequestPart::Inline {
                inline_data: InlineData {
                    mime_type,
                    data: STANDARD.encode(data),
                },
            },
        }
    }
}

/// Gemini REST client
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<Secret<String>>,
}

impl GeminiClient {
    pub fn from_config(config: &GenAiConfig) -> Result<Self, AppError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        if config.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not set; analysis endpoints will return 502");
        }

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, parts: Vec<ContentPart>) -> Result<String, ModelError> {
        let api_key = self.api_key.as_ref().ok_or(ModelError::NotConfigured)?;

        let body = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: parts.into_iter().map(RequestPart::from).collect(),
            }],
        };

        tracing::debug!(model = %self.model, "Calling generative model");

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        extract_text(parsed)
    }
}

fn extract_text(response: GenerateResponse) -> Result<String, ModelError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ModelError::EmptyResponse);
    }

    Ok(text)
}
