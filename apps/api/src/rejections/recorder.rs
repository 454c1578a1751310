//! Delivery outcome recording. Failures here are logged and never undo a send.

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::models::rejection::DueRejectionEmail;
use crate::rejections::repository::{RejectionRepository, RepositoryError};

/// Marks the email `sent` and the application rejected.
pub async fn record_sent(
    repository: &dyn RejectionRepository,
    email: &DueRejectionEmail,
    provider_id: &str,
    sent_at: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    match repository.mark_sent(email.email_id, provider_id, sent_at).await {
        Ok(()) => {
            info!(
                email_id = %email.email_id,
                application_id = %email.application_id,
                provider_id,
                "Rejection email recorded as sent"
            );
            Ok(())
        }
        Err(e) => {
            error!(
                email_id = %email.email_id,
                recipient = %email.recipient_email,
                provider_id,
                error = %e,
                "Rejection email was sent but recording it failed"
            );
            Err(e)
        }
    }
}

/// Marks the email `failed`. The application is left as is.
pub async fn record_failed(
    repository: &dyn RejectionRepository,
    email: &DueRejectionEmail,
    reason: &str,
) {
    if let Err(e) = repository.mark_failed(email.email_id, reason).await {
        error!(
            email_id = %email.email_id,
            recipient = %email.recipient_email,
            error = %e,
            "Failed to record rejection email failure"
        );
    }
}
