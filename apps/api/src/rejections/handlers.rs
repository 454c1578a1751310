use std::time::Instant;

use axum::{extract::State, Extension, Json};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, Instrument, Span};
use uuid::Uuid;

use crate::api::{parse_json, parse_optional_json, ApiResponse};
use crate::errors::{ApiError, AppError};
use crate::middleware::correlation::CorrelationId;
use crate::rejections::dispatcher::{DispatchMode, DispatchSummary};
use crate::rejections::schedule::{schedule_rejection, ScheduleOutcome, ScheduleRequest};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CronRequest {
    /// Trigger time reported by the scheduler. Logged only.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

/// POST /api/v1/internal/cron/send-rejection-emails
///
/// Runs one dispatch over every due rejection email. The run lives in its own
/// task so a caller hanging up does not stop it halfway through a batch.
pub async fn handle_send_rejection_emails(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    body: Bytes,
) -> Result<Json<ApiResponse<DispatchSummary>>, ApiError> {
    let started = Instant::now();
    let request: CronRequest =
        parse_optional_json(&body).map_err(|e| ApiError::new(&correlation, e))?;
    let mode = if request.dry_run {
        DispatchMode::DryRun
    } else {
        DispatchMode::Live
    };

    info!(
        dry_run = request.dry_run,
        job_type = request.job_type.as_deref().unwrap_or("send_rejection_emails"),
        triggered_at = ?request.timestamp,
        "Starting rejection email processing"
    );

    let dispatcher = state.dispatcher.clone();
    let correlation_id = correlation.0.clone();
    let run = tokio::spawn(
        async move { dispatcher.run(mode, &correlation_id, Utc::now()).await }
            .instrument(Span::current()),
    );

    let summary = run
        .await
        .map_err(|e| {
            ApiError::new(
                &correlation,
                AppError::Processing(format!("rejection dispatch task failed: {e}")),
            )
        })?
        .map_err(|e| ApiError::new(&correlation, e))?;

    Ok(ApiResponse::ok(summary, &correlation, started))
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRejectionBody {
    pub application_id: Uuid,
    pub candidate_email: String,
    pub score: i32,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

/// POST /api/v1/internal/rejections/schedule
pub async fn handle_schedule_rejection(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    body: Bytes,
) -> Result<Json<ApiResponse<ScheduleOutcome>>, ApiError> {
    let started = Instant::now();
    let body: ScheduleRejectionBody =
        parse_json(&body).map_err(|e| ApiError::new(&correlation, e))?;
    let request = ScheduleRequest {
        application_id: body.application_id,
        candidate_email: body.candidate_email.trim().to_string(),
        score: body.score,
        rejection_reason: body.rejection_reason,
    };
    request
        .validate()
        .map_err(|msg| ApiError::new(&correlation, AppError::Validation(msg)))?;

    let outcome = schedule_rejection(state.rejections.as_ref(), request, Utc::now())
        .await
        .map_err(|e| ApiError::new(&correlation, e))?;

    Ok(ApiResponse::ok(outcome, &correlation, started))
}
