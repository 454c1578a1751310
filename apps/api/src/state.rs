use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::rejections::dispatcher::RejectionDispatcher;
use crate::rejections::repository::RejectionRepository;
use crate::scoring::repository::ScoreRepository;
use crate::scoring::CandidateScorer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub llm: LlmClient,
    /// Scheduled rejection emails and the application rows they flip.
    pub rejections: Arc<dyn RejectionRepository>,
    /// Built once at startup around the same repository plus the email provider.
    pub dispatcher: Arc<RejectionDispatcher>,
    /// Default: SkillMatchScorer.
    pub scorer: Arc<dyn CandidateScorer>,
    pub scores: Arc<dyn ScoreRepository>,
}
