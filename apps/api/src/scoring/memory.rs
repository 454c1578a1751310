//! In-process `ScoreRepository` used by the scoring and router tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::score::{JobScoreFilter, NewCandidateScore, StoredCandidateScore};
use crate::rejections::repository::RepositoryError;
use crate::scoring::repository::ScoreRepository;

#[derive(Default)]
struct Store {
    scores: HashMap<(Uuid, Uuid), StoredCandidateScore>,
    fail_save: bool,
}

#[derive(Default)]
pub struct InMemoryScoreRepository {
    store: Mutex<Store>,
}

impl InMemoryScoreRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves(&self) {
        self.store.lock().unwrap().fail_save = true;
    }

    pub fn count(&self) -> usize {
        self.store.lock().unwrap().scores.len()
    }
}

#[async_trait]
impl ScoreRepository for InMemoryScoreRepository {
    async fn save_score(
        &self,
        new: NewCandidateScore,
    ) -> Result<StoredCandidateScore, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        if store.fail_save {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }

        let now = Utc::now();
        let key = (new.candidate_id, new.job_posting_id);
        let previous = store.scores.get(&key);
        let score = new.score;
        let row = StoredCandidateScore {
            id: previous.map_or_else(Uuid::new_v4, |p| p.id),
            candidate_id: new.candidate_id,
            job_posting_id: new.job_posting_id,
            application_id: new
                .application_id
                .or_else(|| previous.and_then(|p| p.application_id)),
            overall_score: score.overall_score as i32,
            required_skills_score: score.required_skills_score as i32,
            experience_score: score.experience_score as i32,
            education_score: score.education_score as i32,
            skill_matches: Json(score.skill_matches),
            missing_required_skills: score.missing_required_skills,
            recommendations: score.recommendations,
            auto_rejected: new.auto_rejected,
            auto_rejection_reason: new.auto_rejection_reason,
            scorer_backend: score.scorer_backend,
            processing_time_ms: new.processing_time_ms,
            correlation_id: Some(new.correlation_id),
            created_at: previous.map_or(now, |p| p.created_at),
            updated_at: now,
        };
        store.scores.insert(key, row.clone());
        Ok(row)
    }

    async fn get_score(
        &self,
        candidate_id: Uuid,
        job_posting_id: Uuid,
    ) -> Result<Option<StoredCandidateScore>, RepositoryError> {
        let store = self.store.lock().unwrap();
        Ok(store.scores.get(&(candidate_id, job_posting_id)).cloned())
    }

    async fn job_scores(
        &self,
        job_posting_id: Uuid,
        filter: &JobScoreFilter,
    ) -> Result<Vec<StoredCandidateScore>, RepositoryError> {
        let store = self.store.lock().unwrap();
        let mut rows: Vec<StoredCandidateScore> = store
            .scores
            .values()
            .filter(|row| row.job_posting_id == job_posting_id)
            .filter(|row| filter.min_score.map_or(true, |min| row.overall_score >= min as i32))
            .filter(|row| !filter.auto_rejected_only || row.auto_rejected)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.overall_score
                .cmp(&a.overall_score)
                .then(a.created_at.cmp(&b.created_at))
        });
        if let Some(limit) = filter.limit {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }
}
