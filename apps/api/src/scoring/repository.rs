use async_trait::async_trait;
use uuid::Uuid;

use crate::models::score::{JobScoreFilter, NewCandidateScore, StoredCandidateScore};
use crate::rejections::repository::RepositoryError;

/// Storage for candidate scores, one row per `(candidate, job)` pair.
#[async_trait]
pub trait ScoreRepository: Send + Sync {
    /// Inserts the score, or overwrites the pair's existing row in place.
    async fn save_score(&self, new: NewCandidateScore)
        -> Result<StoredCandidateScore, RepositoryError>;

    async fn get_score(
        &self,
        candidate_id: Uuid,
        job_posting_id: Uuid,
    ) -> Result<Option<StoredCandidateScore>, RepositoryError>;

    /// Scores for a job, highest `overall_score` first.
    async fn job_scores(
        &self,
        job_posting_id: Uuid,
        filter: &JobScoreFilter,
    ) -> Result<Vec<StoredCandidateScore>, RepositoryError>;
}
