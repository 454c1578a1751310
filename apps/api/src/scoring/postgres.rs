//! Postgres-backed `ScoreRepository`.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::score::{JobScoreFilter, NewCandidateScore, StoredCandidateScore};
use crate::rejections::repository::RepositoryError;
use crate::scoring::repository::ScoreRepository;

#[derive(Clone)]
pub struct PgScoreRepository {
    pool: PgPool,
}

impl PgScoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScoreRepository for PgScoreRepository {
    async fn save_score(
        &self,
        new: NewCandidateScore,
    ) -> Result<StoredCandidateScore, RepositoryError> {
        let score = new.score;
        let row: StoredCandidateScore = sqlx::query_as(
            r#"
            INSERT INTO candidate_skill_scores
                (candidate_id, job_posting_id, application_id, overall_score,
                 required_skills_score, experience_score, education_score,
                 skill_matches, missing_required_skills, recommendations,
                 auto_rejected, auto_rejection_reason, scorer_backend,
                 processing_time_ms, correlation_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (candidate_id, job_posting_id) DO UPDATE
            SET application_id = COALESCE(EXCLUDED.application_id, candidate_skill_scores.application_id),
                overall_score = EXCLUDED.overall_score,
                required_skills_score = EXCLUDED.required_skills_score,
                experience_score = EXCLUDED.experience_score,
                education_score = EXCLUDED.education_score,
                skill_matches = EXCLUDED.skill_matches,
                missing_required_skills = EXCLUDED.missing_required_skills,
                recommendations = EXCLUDED.recommendations,
                auto_rejected = EXCLUDED.auto_rejected,
                auto_rejection_reason = EXCLUDED.auto_rejection_reason,
                scorer_backend = EXCLUDED.scorer_backend,
                processing_time_ms = EXCLUDED.processing_time_ms,
                correlation_id = EXCLUDED.correlation_id,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(new.candidate_id)
        .bind(new.job_posting_id)
        .bind(new.application_id)
        .bind(score.overall_score as i32)
        .bind(score.required_skills_score as i32)
        .bind(score.experience_score as i32)
        .bind(score.education_score as i32)
        .bind(Json(&score.skill_matches))
        .bind(&score.missing_required_skills)
        .bind(&score.recommendations)
        .bind(new.auto_rejected)
        .bind(&new.auto_rejection_reason)
        .bind(&score.scorer_backend)
        .bind(new.processing_time_ms)
        .bind(&new.correlation_id)
        .fetch_one(&self.pool)
        .await?;

        debug!(score_id = %row.id, candidate_id = %row.candidate_id, job_id = %row.job_posting_id, "Upserted candidate score");
        Ok(row)
    }

    async fn get_score(
        &self,
        candidate_id: Uuid,
        job_posting_id: Uuid,
    ) -> Result<Option<StoredCandidateScore>, RepositoryError> {
        Ok(sqlx::query_as(
            r#"
            SELECT * FROM candidate_skill_scores
            WHERE candidate_id = $1 AND job_posting_id = $2
            "#,
        )
        .bind(candidate_id)
        .bind(job_posting_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn job_scores(
        &self,
        job_posting_id: Uuid,
        filter: &JobScoreFilter,
    ) -> Result<Vec<StoredCandidateScore>, RepositoryError> {
        // NULL binds switch each filter off.
        Ok(sqlx::query_as(
            r#"
            SELECT * FROM candidate_skill_scores
            WHERE job_posting_id = $1
              AND ($2::INTEGER IS NULL OR overall_score >= $2)
              AND (NOT $3 OR auto_rejected)
            ORDER BY overall_score DESC, created_at ASC
            LIMIT $4
            "#,
        )
        .bind(job_posting_id)
        .bind(filter.min_score.map(|s| s as i32))
        .bind(filter.auto_rejected_only)
        .bind(filter.limit.map(i64::from))
        .fetch_all(&self.pool)
        .await?)
    }
}
