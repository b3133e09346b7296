//! Image analysis

use crate::{
    error::AppError,
    genai::{ContentPart, GenerativeModel},
    models::analysis::ImageAnalysis,
    services::UploadedFile,
};
use std::sync::Arc;

const DESCRIBE_PROMPT: &str = "Analyze this image in detail. Describe what you see, including \
objects, people, colors, composition, and any notable features or context.";

pub struct ImageService {
    model: Arc<dyn GenerativeModel>,
}

impl ImageService {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    pub async fn analyze_image(&self, image: UploadedFile) -> Result<ImageAnalysis, AppError> {
        if image.data.is_empty() {
            return Err(AppError::BadRequest("Uploaded image is empty".to_string()));
        }

        let mime_type = image.mime_or("image/", "image/jpeg");
        let description = self
            .model
            .generate(vec![
                ContentPart::text(DESCRIBE_PROMPT),
                ContentPart::inline(mime_type, image.data),
            ])
            .await?;

        Ok(ImageAnalysis { description })
    }
}
