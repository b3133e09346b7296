//! Business logic services layer

pub mod conversation_service;
pub mod document_service;
pub mod image_service;

pub use conversation_service::ConversationService;
pub use document_service::DocumentService;
pub use image_service::ImageService;

/// A file received from a multipart upload, held in memory
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl UploadedFile {
    /// The upload's content type if it belongs to `family` (e.g. "image/"), else `fallback`
    pub fn mime_or(&self, family: &str, fallback: &str) -> String {
        self.content_type
            .as_deref()
            .filter(|ct| ct.starts_with(family))
            .unwrap_or(fallback)
            .to_string()
    }
}
