use std::time::Instant;

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Extension, Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::api::{parse_json, ApiResponse};
use crate::errors::{ApiError, AppError};
use crate::middleware::correlation::CorrelationId;
use crate::models::resume::ParsedResume;
use crate::models::score::{JobScoreFilter, NewCandidateScore, StoredCandidateScore};
use crate::rejections::schedule::{schedule_rejection, ScheduleOutcome, ScheduleRequest};
use crate::scoring::{auto_rejection_reason, CandidateScore, JobRequirements};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    /// When present the score is stored against `(candidate_id, job.id)`.
    #[serde(default)]
    pub candidate_id: Option<Uuid>,
    #[serde(default)]
    pub application_id: Option<Uuid>,
    #[serde(default)]
    pub candidate_email: Option<String>,
    pub resume: ParsedResume,
    pub job: JobRequirements,
}

#[derive(Debug, Serialize)]
pub struct EvaluationResult {
    #[serde(flatten)]
    pub score: CandidateScore,
    pub auto_rejected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_rejection_reason: Option<String>,
    /// Id of the stored score row; absent when nothing was stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_id: Option<Uuid>,
    /// Present when an auto-rejection was handed to the scheduling rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<ScheduleOutcome>,
}

/// POST /api/v1/internal/scoring/evaluate
///
/// Scores a parsed resume against a job. The score is stored when
/// `candidate_id` is supplied; a failed save is logged and the evaluation
/// still answers. An auto-rejected application is scheduled for a rejection
/// email when both `application_id` and `candidate_email` are supplied.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    body: Bytes,
) -> Result<Json<ApiResponse<EvaluationResult>>, ApiError> {
    let started = Instant::now();
    let request: EvaluateRequest = parse_json(&body).map_err(|e| ApiError::new(&correlation, e))?;

    let score = state
        .scorer
        .score(&request.resume, &request.job)
        .await
        .map_err(|e| ApiError::new(&correlation, e))?;
    let reason = auto_rejection_reason(&score, &request.job);

    info!(
        job_id = %request.job.id,
        application_id = ?request.application_id,
        overall_score = score.overall_score,
        auto_rejected = reason.is_some(),
        "Candidate scored"
    );

    let score_id = match request.candidate_id {
        Some(candidate_id) => {
            let new = NewCandidateScore {
                candidate_id,
                job_posting_id: request.job.id,
                application_id: request.application_id,
                score: score.clone(),
                auto_rejected: reason.is_some(),
                auto_rejection_reason: reason.clone(),
                processing_time_ms: started.elapsed().as_millis() as i64,
                correlation_id: correlation.0.clone(),
            };
            match state.scores.save_score(new).await {
                Ok(row) => Some(row.id),
                Err(e) => {
                    error!(
                        candidate_id = %candidate_id,
                        job_id = %request.job.id,
                        error = %e,
                        "Failed to save candidate score"
                    );
                    None
                }
            }
        }
        None => None,
    };

    let rejection = match (&reason, request.application_id, request.candidate_email) {
        (Some(reason), Some(application_id), Some(candidate_email)) => {
            let schedule = ScheduleRequest {
                application_id,
                candidate_email: candidate_email.trim().to_string(),
                score: score.overall_score as i32,
                rejection_reason: Some(reason.clone()),
            };
            schedule
                .validate()
                .map_err(|msg| ApiError::new(&correlation, AppError::Validation(msg)))?;
            let outcome = schedule_rejection(state.rejections.as_ref(), schedule, Utc::now())
                .await
                .map_err(|e| ApiError::new(&correlation, e))?;
            Some(outcome)
        }
        _ => None,
    };

    let result = EvaluationResult {
        score,
        auto_rejected: reason.is_some(),
        auto_rejection_reason: reason,
        score_id,
        rejection,
    };
    Ok(ApiResponse::ok(result, &correlation, started))
}

/// GET /api/v1/internal/scoring/candidates/:candidate_id/jobs/:job_id
pub async fn handle_get_score(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> Result<Json<ApiResponse<StoredCandidateScore>>, ApiError> {
    let started = Instant::now();
    let Path((candidate_id, job_id)) = path
        .map_err(|e| ApiError::new(&correlation, AppError::Validation(e.body_text())))?;

    let score = state
        .scores
        .get_score(candidate_id, job_id)
        .await
        .map_err(|e| ApiError::new(&correlation, e))?
        .ok_or_else(|| {
            ApiError::new(
                &correlation,
                AppError::NotFound(format!("score for candidate {candidate_id} and job {job_id}")),
            )
        })?;
    Ok(ApiResponse::ok(score, &correlation, started))
}

/// GET /api/v1/internal/scoring/jobs/:job_id/scores
///
/// Query: `min_score`, `auto_rejected_only`, `limit`.
pub async fn handle_job_scores(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<JobScoreFilter>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<StoredCandidateScore>>>, ApiError> {
    let started = Instant::now();
    let Path(job_id) = path
        .map_err(|e| ApiError::new(&correlation, AppError::Validation(e.body_text())))?;
    let Query(filter) = query
        .map_err(|e| ApiError::new(&correlation, AppError::Validation(e.body_text())))?;

    let scores = state
        .scores
        .job_scores(job_id, &filter)
        .await
        .map_err(|e| ApiError::new(&correlation, e))?;
    info!(job_id = %job_id, count = scores.len(), "Listed job scores");
    Ok(ApiResponse::ok(scores, &correlation, started))
}
