//! Plain-text extraction from uploaded resume files.

use bytes::Bytes;
use tracing::{error, info};

use crate::resumes::ResumeError;

pub const PDF: &str = "application/pdf";
pub const PLAIN_TEXT: &str = "text/plain";
const MS_WORD: &str = "application/msword";
const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Resolves the effective MIME type. Generic or missing part types fall back to
/// the file extension.
pub fn detect_mime(content_type: Option<&str>, file_name: Option<&str>) -> String {
    let declared = content_type
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");
    if let Some(declared) = declared {
        return declared;
    }

    let extension = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("pdf") => PDF.to_string(),
        Some("txt") => PLAIN_TEXT.to_string(),
        Some("doc") => MS_WORD.to_string(),
        Some("docx") => DOCX.to_string(),
        _ => "application/octet-stream".to_string(),
    }
}

/// Extracts text according to `mime`. PDF parsing runs on the blocking pool.
pub async fn extract_text(data: Bytes, mime: &str) -> Result<String, ResumeError> {
    info!(mime, size = data.len(), "Extracting resume text");

    let text = match mime {
        PDF => tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
            .await
            .map_err(|e| ResumeError::Pdf(format!("extraction task failed: {e}")))?
            .map_err(|e| {
                error!(error = %e, "Failed to extract text from PDF");
                ResumeError::Pdf(e.to_string())
            })?,
        PLAIN_TEXT => String::from_utf8(data.to_vec()).map_err(|_| ResumeError::InvalidUtf8)?,
        MS_WORD => return Err(ResumeError::LegacyDoc),
        other => return Err(ResumeError::UnsupportedType(other.to_string())),
    };

    if text.trim().is_empty() {
        return Err(ResumeError::EmptyText);
    }
    info!(text_length = text.len(), "Resume text extracted");
    Ok(text)
}
