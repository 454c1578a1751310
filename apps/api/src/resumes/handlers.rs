use std::time::Instant;

use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use tracing::{error, info};

use crate::api::ApiResponse;
use crate::errors::{ApiError, AppError};
use crate::middleware::correlation::CorrelationId;
use crate::models::resume::ParsedResume;
use crate::resumes::extract::{detect_mime, extract_text};
use crate::resumes::parser::parse_resume;
use crate::state::AppState;

/// Upload ceiling for the resume route.
pub const MAX_RESUME_BYTES: usize = 10 * 1024 * 1024;

/// POST /api/v1/internal/resumes/parse
///
/// Multipart upload with a single `file` part (PDF or plain text).
pub async fn handle_parse_resume(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ParsedResume>>, ApiError> {
    let started = Instant::now();

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!(error = %e, "Failed to read multipart field");
        ApiError::new(&correlation, AppError::Validation(format!("Invalid multipart body: {e}")))
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let mime = detect_mime(field.content_type(), field.file_name());
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(|e| {
            ApiError::new(&correlation, AppError::Validation(format!("Failed to read file: {e}")))
        })?;
        upload = Some((mime, file_name, data));
        break;
    }

    let (mime, file_name, data) = upload.ok_or_else(|| {
        ApiError::new(
            &correlation,
            AppError::Validation("Missing multipart field 'file'".to_string()),
        )
    })?;

    info!(
        correlation_id = %correlation.0,
        file_name = file_name.as_deref().unwrap_or("<unnamed>"),
        mime = %mime,
        size = data.len(),
        "Resume upload received"
    );

    let text = extract_text(data, &mime)
        .await
        .map_err(|e| ApiError::new(&correlation, e))?;
    let resume = parse_resume(&state.llm, &text)
        .await
        .map_err(|e| ApiError::new(&correlation, e))?;

    Ok(ApiResponse::ok(resume, &correlation, started))
}
