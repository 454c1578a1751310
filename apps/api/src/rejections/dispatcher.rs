//! Batch dispatcher for due rejection emails.
//!
//! Batches run one after another with a throttle delay in between; the emails
//! inside a batch are delivered concurrently and every delivery settles to a
//! `DeliveryOutcome`, so one failure never cancels its siblings.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::email::{EmailMetadata, EmailSender, TemplateVars, CANDIDATE_REJECTION};
use crate::models::rejection::DueRejectionEmail;
use crate::rejections::recorder;
use crate::rejections::repository::{RejectionRepository, RepositoryError};

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    pub batch_size: usize,
    /// Pause between consecutive batches. Zero disables throttling.
    pub batch_delay: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Live,
    /// Select and batch only. Nothing is claimed, sent or recorded.
    DryRun,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub processed: usize,
    pub sent: usize,
    pub failed: usize,
    pub batch_count: usize,
    /// Emails another run claimed first.
    #[serde(skip_serializing_if = "is_zero")]
    pub skipped: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to select due rejection emails: {0}")]
    Selection(#[source] RepositoryError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent { provider_id: String },
    Failed { reason: String },
    Skipped,
}

pub struct RejectionDispatcher {
    repository: Arc<dyn RejectionRepository>,
    mailer: Arc<dyn EmailSender>,
    settings: DispatchSettings,
}

impl RejectionDispatcher {
    pub fn new(
        repository: Arc<dyn RejectionRepository>,
        mailer: Arc<dyn EmailSender>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            repository,
            mailer,
            settings,
        }
    }

    /// Dispatches every email due at `now`.
    ///
    /// Only the initial selection can fail the run; per-email problems are
    /// counted in the summary.
    pub async fn run(
        &self,
        mode: DispatchMode,
        correlation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DispatchSummary, DispatchError> {
        let dry_run = mode == DispatchMode::DryRun;
        let due = self
            .repository
            .select_due(now)
            .await
            .map_err(DispatchError::Selection)?;

        if due.is_empty() {
            info!(dry_run, "No due rejection emails");
            return Ok(DispatchSummary::default());
        }

        let batch_size = self.settings.batch_size.max(1);
        let mut summary = DispatchSummary {
            processed: due.len(),
            batch_count: due.len().div_ceil(batch_size),
            ..Default::default()
        };
        info!(
            dry_run,
            due = due.len(),
            batches = summary.batch_count,
            "Dispatching rejection emails"
        );

        for (index, batch) in due.chunks(batch_size).enumerate() {
            let batch_number = index + 1;

            if dry_run {
                for email in batch {
                    info!(
                        dry_run,
                        batch = batch_number,
                        email_id = %email.email_id,
                        recipient = %email.recipient_email,
                        "Would send rejection email"
                    );
                }
                summary.sent += batch.len();
                continue;
            }

            info!(batch = batch_number, size = batch.len(), "Processing batch");
            let outcomes = join_all(
                batch
                    .iter()
                    .map(|email| self.deliver(email, correlation_id)),
            )
            .await;
            for outcome in outcomes {
                match outcome {
                    DeliveryOutcome::Sent { .. } => summary.sent += 1,
                    DeliveryOutcome::Failed { .. } => summary.failed += 1,
                    DeliveryOutcome::Skipped => summary.skipped += 1,
                }
            }

            if batch_number < summary.batch_count && !self.settings.batch_delay.is_zero() {
                tokio::time::sleep(self.settings.batch_delay).await;
            }
        }

        info!(
            dry_run,
            processed = summary.processed,
            sent = summary.sent,
            failed = summary.failed,
            skipped = summary.skipped,
            batch_count = summary.batch_count,
            "Rejection email dispatch complete"
        );
        Ok(summary)
    }

    /// Claim, send, record. Never returns an error; every path settles to an outcome.
    async fn deliver(&self, email: &DueRejectionEmail, correlation_id: &str) -> DeliveryOutcome {
        match self.repository.claim(email.email_id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    email_id = %email.email_id,
                    recipient = %email.recipient_email,
                    "Rejection email already claimed by another run, skipping"
                );
                return DeliveryOutcome::Skipped;
            }
            Err(e) => {
                error!(
                    email_id = %email.email_id,
                    recipient = %email.recipient_email,
                    error = %e,
                    "Failed to claim rejection email"
                );
                return DeliveryOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        }

        let metadata = EmailMetadata {
            correlation_id: Some(correlation_id.to_string()),
            application_id: Some(email.application_id),
            idempotency_key: Some(format!("rejection-{}", email.email_id)),
        };
        let sent = self
            .mailer
            .send_templated(
                CANDIDATE_REJECTION,
                &rejection_vars(email),
                &email.recipient_email,
                &metadata,
            )
            .await;

        match sent {
            Ok(provider_id) => {
                match recorder::record_sent(self.repository.as_ref(), email, &provider_id, Utc::now())
                    .await
                {
                    Ok(()) => DeliveryOutcome::Sent { provider_id },
                    // Row stays `processing` so no later run sends it again.
                    Err(e) => DeliveryOutcome::Failed {
                        reason: format!("sent as {provider_id} but not recorded: {e}"),
                    },
                }
            }
            Err(e) => {
                let reason = e.to_string();
                error!(
                    email_id = %email.email_id,
                    recipient = %email.recipient_email,
                    error = %reason,
                    "Failed to send rejection email"
                );
                recorder::record_failed(self.repository.as_ref(), email, &reason).await;
                DeliveryOutcome::Failed { reason }
            }
        }
    }
}

fn rejection_vars(email: &DueRejectionEmail) -> TemplateVars {
    TemplateVars::from([
        ("candidate_name".to_string(), email.candidate_name.clone()),
        ("job_title".to_string(), email.job_title.clone()),
        ("company_name".to_string(), email.company_name.clone()),
        ("application_id".to_string(), email.application_id.to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::email::fake::ScriptedEmailSender;
    use crate::models::rejection::RejectionEmailStatus;
    use crate::rejections::memory::InMemoryRejectionRepository;

    fn seed_due(repo: &InMemoryRejectionRepository, count: usize) -> Vec<uuid::Uuid> {
        let past = Utc::now() - ChronoDuration::hours(1);
        (0..count)
            .map(|i| {
                repo.seed_email(
                    &format!("candidate{i}@example.com"),
                    past - ChronoDuration::seconds(i as i64),
                    RejectionEmailStatus::Pending,
                )
            })
            .collect()
    }

    fn dispatcher(
        repo: Arc<InMemoryRejectionRepository>,
        mailer: Arc<ScriptedEmailSender>,
        batch_delay: Duration,
    ) -> RejectionDispatcher {
        RejectionDispatcher::new(
            repo,
            mailer,
            DispatchSettings {
                batch_size: DEFAULT_BATCH_SIZE,
                batch_delay,
            },
        )
    }

    #[tokio::test]
    async fn test_nothing_due_returns_zero_summary() {
        let repo = Arc::new(InMemoryRejectionRepository::new());
        let mailer = Arc::new(ScriptedEmailSender::new());
        let summary = dispatcher(repo, mailer.clone(), Duration::ZERO)
            .run(DispatchMode::Live, "corr", Utc::now())
            .await
            .unwrap();
        assert_eq!(summary, DispatchSummary::default());
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_batch_count_is_ceiling() {
        for (n, expected) in [(1, 1), (49, 1), (50, 1), (51, 2), (100, 2), (101, 3)] {
            let repo = Arc::new(InMemoryRejectionRepository::new());
            seed_due(&repo, n);
            let summary = dispatcher(repo, Arc::new(ScriptedEmailSender::new()), Duration::ZERO)
                .run(DispatchMode::DryRun, "corr", Utc::now())
                .await
                .unwrap();
            assert_eq!(summary.batch_count, expected, "n = {n}");
            assert_eq!(summary.processed, n);
        }
    }

    #[tokio::test]
    async fn test_all_sent_updates_every_application() {
        let repo = Arc::new(InMemoryRejectionRepository::new());
        let ids = seed_due(&repo, 75);
        let mailer = Arc::new(ScriptedEmailSender::new());

        let summary = dispatcher(repo.clone(), mailer.clone(), Duration::ZERO)
            .run(DispatchMode::Live, "corr", Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.batch_count, 2);
        assert_eq!(summary.sent, 75);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.processed, 75);
        assert_eq!(mailer.sent().len(), 75);
        for id in ids {
            let row = repo.email(id).unwrap();
            assert_eq!(row.status(), RejectionEmailStatus::Sent);
            assert!(row.email_service_id.is_some());
            let application = repo.application(row.application_id).unwrap();
            assert!(application.rejection_email_sent);
            assert_eq!(application.status, "rejected");
        }
    }

    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        let repo = Arc::new(InMemoryRejectionRepository::new());
        let ids = seed_due(&repo, 10);
        let mailer = Arc::new(ScriptedEmailSender::failing_for([
            "candidate3@example.com",
            "candidate7@example.com",
        ]));

        let summary = dispatcher(repo.clone(), mailer, Duration::ZERO)
            .run(DispatchMode::Live, "corr", Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.sent, 8);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.sent + summary.failed, summary.processed);
        for id in ids {
            let row = repo.email(id).unwrap();
            let application = repo.application(row.application_id).unwrap();
            if row.recipient_email == "candidate3@example.com"
                || row.recipient_email == "candidate7@example.com"
            {
                assert_eq!(row.status(), RejectionEmailStatus::Failed);
                assert!(row.error_message.unwrap().contains("rejected"));
                assert!(!application.rejection_email_sent);
                assert_eq!(application.status, "reviewing");
            } else {
                assert_eq!(row.status(), RejectionEmailStatus::Sent);
                assert!(application.rejection_email_sent);
            }
        }
    }

    #[tokio::test]
    async fn test_dry_run_leaves_rows_pending() {
        let repo = Arc::new(InMemoryRejectionRepository::new());
        let ids = seed_due(&repo, 60);
        let mailer = Arc::new(ScriptedEmailSender::new());

        let summary = dispatcher(repo.clone(), mailer.clone(), DEFAULT_BATCH_DELAY)
            .run(DispatchMode::DryRun, "corr", Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.sent, summary.processed);
        assert_eq!(summary.batch_count, 2);
        assert_eq!(summary.failed, 0);
        assert!(mailer.sent().is_empty());
        for id in ids {
            assert_eq!(repo.email(id).unwrap().status(), RejectionEmailStatus::Pending);
        }
    }

    #[tokio::test]
    async fn test_selector_excludes_future_emails() {
        let repo = Arc::new(InMemoryRejectionRepository::new());
        let now = Utc::now();
        let past = repo.seed_email(
            "past@example.com",
            now - ChronoDuration::minutes(1),
            RejectionEmailStatus::Pending,
        );
        let future = repo.seed_email(
            "future@example.com",
            now + ChronoDuration::minutes(1),
            RejectionEmailStatus::Pending,
        );

        let due = repo.select_due(now).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].email_id, past);

        let summary = dispatcher(repo.clone(), Arc::new(ScriptedEmailSender::new()), Duration::ZERO)
            .run(DispatchMode::Live, "corr", now)
            .await
            .unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(repo.email(future).unwrap().status(), RejectionEmailStatus::Pending);
    }

    #[tokio::test]
    async fn test_selection_failure_aborts_run() {
        let repo = Arc::new(InMemoryRejectionRepository::new());
        seed_due(&repo, 3);
        repo.fail_selection();
        let mailer = Arc::new(ScriptedEmailSender::new());

        let err = dispatcher(repo, mailer.clone(), Duration::ZERO)
            .run(DispatchMode::Live, "corr", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Selection(_)));
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unrecorded_send_counts_failed_and_stays_processing() {
        let repo = Arc::new(InMemoryRejectionRepository::new());
        let ids = seed_due(&repo, 3);
        repo.fail_mark_sent_for(ids[1]);

        let summary = dispatcher(repo.clone(), Arc::new(ScriptedEmailSender::new()), Duration::ZERO)
            .run(DispatchMode::Live, "corr", Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.sent, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(repo.email(ids[1]).unwrap().status(), RejectionEmailStatus::Processing);

        // A later run must not pick it up again.
        let again = dispatcher(repo, Arc::new(ScriptedEmailSender::new()), Duration::ZERO)
            .run(DispatchMode::Live, "corr", Utc::now())
            .await
            .unwrap();
        assert_eq!(again.processed, 0);
    }

    #[tokio::test]
    async fn test_claim_error_leaves_row_pending() {
        let repo = Arc::new(InMemoryRejectionRepository::new());
        let ids = seed_due(&repo, 2);
        repo.fail_claim_for(ids[0]);
        let mailer = Arc::new(ScriptedEmailSender::new());

        let summary = dispatcher(repo.clone(), mailer.clone(), Duration::ZERO)
            .run(DispatchMode::Live, "corr", Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.sent, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(mailer.sent().len(), 1);
        assert_eq!(repo.email(ids[0]).unwrap().status(), RejectionEmailStatus::Pending);
    }

    #[tokio::test]
    async fn test_overlapping_runs_never_double_send() {
        let repo = Arc::new(InMemoryRejectionRepository::new());
        seed_due(&repo, 20);
        let mailer = Arc::new(ScriptedEmailSender::new().with_latency(Duration::from_millis(5)));
        let first = dispatcher(repo.clone(), mailer.clone(), Duration::ZERO);
        let second = dispatcher(repo.clone(), mailer.clone(), Duration::ZERO);
        let now = Utc::now();

        let (a, b) = tokio::join!(
            first.run(DispatchMode::Live, "run-a", now),
            second.run(DispatchMode::Live, "run-b", now)
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.sent + b.sent, 20);
        assert_eq!(a.sent + a.failed + a.skipped, a.processed);
        assert_eq!(b.sent + b.failed + b.skipped, b.processed);
        let mut recipients: Vec<String> = mailer.sent().into_iter().map(|s| s.to).collect();
        recipients.sort();
        recipients.dedup();
        assert_eq!(recipients.len(), 20);
    }

    #[tokio::test]
    async fn test_email_claimed_elsewhere_is_skipped() {
        let repo = Arc::new(InMemoryRejectionRepository::new());
        seed_due(&repo, 1);
        let mailer = Arc::new(ScriptedEmailSender::new());
        let due = repo.select_due(Utc::now()).await.unwrap();
        assert!(repo.claim(due[0].email_id).await.unwrap());

        let outcome = dispatcher(repo.clone(), mailer.clone(), Duration::ZERO)
            .deliver(&due[0], "corr")
            .await;

        assert_eq!(outcome, DeliveryOutcome::Skipped);
        assert!(mailer.sent().is_empty());
        assert_eq!(
            repo.email(due[0].email_id).unwrap().status(),
            RejectionEmailStatus::Processing
        );
    }

    #[tokio::test]
    async fn test_idempotency_key_derived_from_email_id() {
        let repo = Arc::new(InMemoryRejectionRepository::new());
        let ids = seed_due(&repo, 1);
        let mailer = Arc::new(ScriptedEmailSender::new());

        dispatcher(repo, mailer.clone(), Duration::ZERO)
            .run(DispatchMode::Live, "corr", Utc::now())
            .await
            .unwrap();

        let sent = mailer.sent();
        assert_eq!(
            sent[0].idempotency_key.as_deref(),
            Some(format!("rejection-{}", ids[0]).as_str())
        );
        assert_eq!(
            sent[0].subject,
            "Update on your application for Backend Engineer at Acme"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_sleeps_between_batches_only() {
        let repo = Arc::new(InMemoryRejectionRepository::new());
        seed_due(&repo, 120);
        let started = tokio::time::Instant::now();

        let summary = dispatcher(repo, Arc::new(ScriptedEmailSender::new()), Duration::from_secs(1))
            .run(DispatchMode::Live, "corr", Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.batch_count, 3);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn test_skipped_only_serialized_when_nonzero() {
        let summary = DispatchSummary {
            processed: 2,
            sent: 2,
            ..Default::default()
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert!(value.get("skipped").is_none());
        assert_eq!(value["batch_count"], 0);

        let value = serde_json::to_value(DispatchSummary {
            skipped: 1,
            ..summary
        })
        .unwrap();
        assert_eq!(value["skipped"], 1);
    }
}
