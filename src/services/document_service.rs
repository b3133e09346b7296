//! Document summarization from uploaded files or web pages

use crate::{
    config::GenAiConfig,
    error::AppError,
    genai::{ContentPart, GenerativeModel},
    models::analysis::DocumentSummary,
    services::UploadedFile,
};
use quick_xml::events::Event;
use reqwest::{Client, Response, Url};
use std::{
    io::{Cursor, Read},
    path::Path,
    sync::Arc,
    time::Duration,
};
use thiserror::Error;

const FILE_PROMPT: &str = "Please provide a comprehensive summary of the following document:\n\n";
const URL_PROMPT: &str =
    "Please provide a comprehensive summary of the content from this webpage:\n\n";

/// Upper bound on UTF-8 bytes per character
const MAX_UTF8_BYTES: usize = 4;

pub struct DocumentService {
    model: Arc<dyn GenerativeModel>,
    http: Client,
    max_prompt_chars: usize,
    max_fetch_bytes: u64,
}

impl DocumentService {
    pub fn new(model: Arc<dyn GenerativeModel>, config: &GenAiConfig) -> Result<Self, AppError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.url_fetch_timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            model,
            http,
            max_prompt_chars: config.max_prompt_chars,
            max_fetch_bytes: config.max_fetch_bytes,
        })
    }

    pub async fn summarize_file(&self, file: UploadedFile) -> Result<DocumentSummary, AppError> {
        let file_name = file.file_name.unwrap_or_default();
        let text = extract_text(&file_name, file.data).await?;

        self.summarize(FILE_PROMPT, &text).await
    }

    pub async fn summarize_url(&self, url: &str) -> Result<DocumentSummary, AppError> {
        let url = Url::parse(url.trim())
            .map_err(|_| AppError::BadRequest("Invalid URL".to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::BadRequest("Only http and https URLs are supported".to_string()));
        }

        tracing::debug!(%url, "Fetching document URL");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::BadRequest(format!("Error fetching URL: {}", e)))?;

        if let Some(length) = response.content_length() {
            if length > self.max_fetch_bytes {
                tracing::info!(length, limit = self.max_fetch_bytes, "URL content too large");
                return Err(AppError::BadRequest("URL content too large".to_string()));
            }
        }

        // 只读取模型提示所需的字节数，其余内容直接丢弃
        let limit = self.max_prompt_chars.saturating_mul(MAX_UTF8_BYTES);
        let body = read_capped(response, limit)
            .await
            .map_err(|e| AppError::BadRequest(format!("Error reading URL content: {}", e)))?;

        let text = decode_lossy_prefix(&body, body.len() >= limit);
        self.summarize(URL_PROMPT, &text).await
    }

    async fn summarize(&self, prompt: &str, text: &str) -> Result<DocumentSummary, AppError> {
        if text.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Document contains no extractable text".to_string(),
            ));
        }

        let excerpt = truncate_chars(text, self.max_prompt_chars);
        let summary = self
            .model
            .generate(vec![ContentPart::text(format!("{}{}", prompt, excerpt))])
            .await?;

        Ok(DocumentSummary { summary })
    }
}

/// Read at most `limit` bytes of the response body
async fn read_capped(mut response: Response, limit: usize) -> Result<Vec<u8>, reqwest::Error> {
    let mut body = Vec::new();

    while let Some(chunk) = response.chunk().await? {
        let remaining = limit - body.len();
        if chunk.len() >= remaining {
            body.extend_from_slice(&chunk[..remaining]);
            break;
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

/// Decode bytes as UTF-8, dropping a character split by truncation
fn decode_lossy_prefix(bytes: &[u8], truncated: bool) -> String {
    let text = String::from_utf8_lossy(bytes);
    if truncated {
        text.trim_end_matches('\u{FFFD}').to_string()
    } else {
        text.into_owned()
    }
}

/// At most `max` characters of `text`, cut on a char boundary
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Extract plain text based on the file extension
pub async fn extract_text(file_name: &str, data: Vec<u8>) -> Result<String, AppError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("pdf") => {
            run_extractor("PDF", move || {
                pdf_extract::extract_text_from_mem(&data).map_err(|e| e.to_string())
            })
            .await
        }
        Some("docx") | Some("doc") => {
            run_extractor("DOCX", move || docx_text(&data).map_err(|e| e.to_string())).await
        }
        Some("txt") | Some("md") => Ok(String::from_utf8_lossy(&data).into_owned()),
        Some(other) => Err(AppError::BadRequest(format!("Unsupported file type: .{}", other))),
        None => Err(AppError::BadRequest("Unsupported file type: missing extension".to_string())),
    }
}

/// Run a CPU-bound parser on the blocking pool.
///
/// Parser errors and parser panics are both reported as unreadable input.
async fn run_extractor<F>(kind: &'static str, parse: F) -> Result<String, AppError>
where
    F: FnOnce() -> Result<String, String> + Send + 'static,
{
    match tokio::task::spawn_blocking(parse).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(AppError::BadRequest(format!("Error reading {}: {}", kind, e))),
        Err(e) if e.is_panic() => {
            tracing::warn!(kind, "Document parser panicked");
            Err(AppError::BadRequest(format!("Error reading {}", kind)))
        }
        Err(e) => Err(AppError::Internal(format!("{} extraction task failed: {}", kind, e))),
    }
}

#[derive(Debug, Error)]
enum DocxError {
    #[error("not a DOCX archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("failed to read document body: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid document XML: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Paragraph text of a DOCX file, one line per `w:p`
fn docx_text(data: &[u8]) -> Result<String, DocxError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
    let mut xml = String::new();
    archive.by_name("word/document.xml")?.read_to_string(&mut xml)?;

    let mut reader = quick_xml::Reader::from_str(&xml);
    let mut text = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" | b"br" => text.push('\n'),
                b"tab" => text.push('\t'),
                _ => {}
            },
            Event::Text(t) if in_text => text.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn build_docx(body_xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        write!(
            writer,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body_xml
        )
        .unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_decode_lossy_prefix_drops_split_char() {
        let bytes = "héllo".as_bytes();
        // 截断在 "é" 的两个字节之间
        assert_eq!(decode_lossy_prefix(&bytes[..2], true), "h");
        assert_eq!(decode_lossy_prefix(bytes, false), "héllo");
    }

    #[tokio::test]
    async fn test_extract_plain_text() {
        let text = extract_text("notes.TXT", b"meeting notes".to_vec()).await.unwrap();
        assert_eq!(text, "meeting notes");

        let text = extract_text("readme.md", b"# Title".to_vec()).await.unwrap();
        assert_eq!(text, "# Title");
    }

    #[tokio::test]
    async fn test_extract_docx_paragraphs() {
        let docx = build_docx(
            r#"<w:p><w:r><w:t>First paragraph</w:t></w:r></w:p><w:p/><w:p><w:r><w:t xml:space="preserve">Second </w:t></w:r><w:r><w:t>&amp; last</w:t></w:r></w:p>"#,
        );

        let text = extract_text("report.docx", docx).await.unwrap();
        assert_eq!(text, "First paragraph\n\nSecond & last\n");
    }

    #[tokio::test]
    async fn test_extract_docx_not_an_archive() {
        let err = extract_text("report.docx", b"plain bytes".to_vec()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.starts_with("Error reading DOCX")));
    }

    #[tokio::test]
    async fn test_extract_unsupported() {
        let err = extract_text("slides.pptx", vec![1, 2, 3]).await.unwrap_err();
        assert_eq!(err.user_message(), "Unsupported file type: .pptx");

        assert!(matches!(
            extract_text("noextension", vec![]).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_extract_corrupt_pdf() {
        let err = extract_text("broken.pdf", b"not a pdf".to_vec()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_parser_panic_is_bad_request() {
        let err = run_extractor("PDF", || panic!("parser blew up")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "Error reading PDF"));
    }
}
