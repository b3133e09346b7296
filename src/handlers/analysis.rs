//! 分析类 HTTP 处理器（音频、图片、文档）

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::analysis::{ConversationAnalysis, DocumentSummary, ImageAnalysis},
    services::UploadedFile,
};
use axum::{
    extract::{
        multipart::{Field, MultipartError},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use std::{collections::HashMap, sync::Arc};

/// 解析后的 multipart 表单
#[derive(Debug, Default)]
struct UploadForm {
    files: HashMap<String, UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }

    fn require_file(&mut self, name: &str) -> Result<UploadedFile, AppError> {
        self.take_file(name)
            .ok_or_else(|| AppError::BadRequest(format!("Missing file field: {}", name)))
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge;
    }
    AppError::BadRequest(format!("Invalid multipart body: {}", e.body_text()))
}

async fn read_file(field: Field<'_>, file_name: String) -> Result<UploadedFile, AppError> {
    let content_type = field.content_type().map(str::to_string);
    let data = field.bytes().await.map_err(multipart_error)?;

    Ok(UploadedFile {
        file_name: Some(file_name),
        content_type,
        data: data.to_vec(),
    })
}

/// 读取整个 multipart 表单（文件保存在内存中，大小受请求体限制约束）
async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);

        match file_name {
            Some(file_name) => {
                let file = read_file(field, file_name).await?;
                form.files.insert(name, file);
            }
            None => {
                let value = field.text().await.map_err(multipart_error)?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

/// 对话音频分析
pub async fn analyze_conversation(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    multipart: Multipart,
) -> Result<Json<ConversationAnalysis>, AppError> {
    let audio = read_form(multipart).await?.require_file("audio")?;

    tracing::info!(
        username = %auth_context.identity.username,
        bytes = audio.data.len(),
        "Conversation analysis requested"
    );

    let result = state.conversation_service.analyze_audio(audio).await?;
    Ok(Json(result))
}

/// 图片分析
pub async fn analyze_image(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    multipart: Multipart,
) -> Result<Json<ImageAnalysis>, AppError> {
    let image = read_form(multipart).await?.require_file("image")?;

    tracing::info!(
        username = %auth_context.identity.username,
        bytes = image.data.len(),
        "Image analysis requested"
    );

    let result = state.image_service.analyze_image(image).await?;
    Ok(Json(result))
}

/// 文档摘要：上传文件优先，其次为 URL
pub async fn summarize_document(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    multipart: Multipart,
) -> Result<Json<DocumentSummary>, AppError> {
    let mut form = read_form(multipart).await?;

    let result = if let Some(file) = form.take_file("file") {
        tracing::info!(
            username = %auth_context.identity.username,
            file_name = file.file_name.as_deref().unwrap_or_default(),
            "Document summary requested"
        );
        state.document_service.summarize_file(file).await?
    } else if let Some(url) = form.text("url") {
        tracing::info!(
            username = %auth_context.identity.username,
            %url,
            "URL summary requested"
        );
        state.document_service.summarize_url(url).await?
    } else {
        return Err(AppError::BadRequest(
            "Either file or URL must be provided".to_string(),
        ));
    };

    Ok(Json(result))
}
