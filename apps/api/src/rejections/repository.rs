use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::rejection::{
    DueRejectionEmail, NewScheduledRejection, OrganizationRejectionSettings,
    RejectionEmailStatus, ScheduledRejectionEmail,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("rejection email {email_id} is already {status}")]
    Terminal {
        email_id: Uuid,
        status: RejectionEmailStatus,
    },
}

/// Result of the idempotent per-application upsert.
#[derive(Debug, Clone)]
pub enum ScheduleResult {
    /// Row inserted, or an existing `pending` row refreshed.
    Scheduled(ScheduledRejectionEmail),
    /// A row exists past `pending`; nothing was written.
    AlreadyProcessed(RejectionEmailStatus),
}

/// Storage seam for the rejection pipeline. The dispatcher and scheduling rule
/// only talk to this trait, so the backing store's call convention stays out
/// of the pipeline logic.
#[async_trait]
pub trait RejectionRepository: Send + Sync {
    /// Settings of the organization owning the application.
    /// `Ok(None)` when the organization never saved any; `NotFound` when the
    /// application itself does not exist.
    async fn rejection_settings(
        &self,
        application_id: Uuid,
    ) -> Result<Option<OrganizationRejectionSettings>, RepositoryError>;

    /// Upsert keyed by application. Only a `pending` row may be overwritten.
    async fn schedule_pending(
        &self,
        new: NewScheduledRejection,
    ) -> Result<ScheduleResult, RepositoryError>;

    /// `pending` rows with `scheduled_for <= now`, oldest first. No side effects.
    async fn select_due(&self, now: DateTime<Utc>)
        -> Result<Vec<DueRejectionEmail>, RepositoryError>;

    /// Conditional `pending -> processing`. `false` when another run got there first.
    async fn claim(&self, email_id: Uuid) -> Result<bool, RepositoryError>;

    /// Marks the email `sent` and flips the parent application to rejected, atomically.
    async fn mark_sent(
        &self,
        email_id: Uuid,
        email_service_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Marks the email `failed`. The application is left untouched.
    async fn mark_failed(&self, email_id: Uuid, error_message: &str)
        -> Result<(), RepositoryError>;
}
