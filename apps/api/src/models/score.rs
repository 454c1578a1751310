use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::scoring::{CandidateScore, SkillMatch};

/// A score to persist, keyed by `(candidate_id, job_posting_id)`.
#[derive(Debug, Clone)]
pub struct NewCandidateScore {
    pub candidate_id: Uuid,
    pub job_posting_id: Uuid,
    pub application_id: Option<Uuid>,
    pub score: CandidateScore,
    pub auto_rejected: bool,
    pub auto_rejection_reason: Option<String>,
    pub processing_time_ms: i64,
    pub correlation_id: String,
}

/// Row of `candidate_skill_scores`. Re-scoring a candidate for the same job
/// overwrites the row, so there is at most one per pair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoredCandidateScore {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_posting_id: Uuid,
    pub application_id: Option<Uuid>,
    pub overall_score: i32,
    pub required_skills_score: i32,
    pub experience_score: i32,
    pub education_score: i32,
    pub skill_matches: Json<Vec<SkillMatch>>,
    pub missing_required_skills: Vec<String>,
    pub recommendations: Vec<String>,
    pub auto_rejected: bool,
    pub auto_rejection_reason: Option<String>,
    pub scorer_backend: String,
    pub processing_time_ms: i64,
    pub correlation_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filters for listing a job's scores. Results are ordered best first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobScoreFilter {
    #[serde(default)]
    pub min_score: Option<u32>,
    #[serde(default)]
    pub auto_rejected_only: bool,
    #[serde(default)]
    pub limit: Option<u32>,
}
