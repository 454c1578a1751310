pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};

use crate::middleware::correlation::correlation_middleware;
use crate::middleware::internal_auth::internal_auth;
use crate::rejections::handlers::{handle_schedule_rejection, handle_send_rejection_emails};
use crate::resumes::handlers::{handle_parse_resume, MAX_RESUME_BYTES};
use crate::scoring::handlers::{handle_evaluate, handle_get_score, handle_job_scores};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Service-to-service routes, all behind the shared secret.
    let internal = Router::new()
        .route(
            "/cron/send-rejection-emails",
            post(handle_send_rejection_emails),
        )
        .route("/rejections/schedule", post(handle_schedule_rejection))
        .route("/scoring/evaluate", post(handle_evaluate))
        .route(
            "/scoring/candidates/:candidate_id/jobs/:job_id",
            get(handle_get_score),
        )
        .route("/scoring/jobs/:job_id/scores", get(handle_job_scores))
        .route(
            "/resumes/parse",
            post(handle_parse_resume).layer(DefaultBodyLimit::max(MAX_RESUME_BYTES)),
        )
        .route_layer(from_fn_with_state(state.clone(), internal_auth));

    Router::new()
        .route("/health", get(health::health_handler))
        .nest("/api/v1/internal", internal)
        .layer(from_fn(correlation_middleware))
        .with_state(state)
}
