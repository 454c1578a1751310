//! Postgres-backed `RejectionRepository`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::rejection::{
    DueRejectionEmail, NewScheduledRejection, OrganizationRejectionSettings,
    RejectionEmailStatus, ScheduledRejectionEmail,
};
use crate::rejections::repository::{RejectionRepository, RepositoryError, ScheduleResult};

#[derive(Clone)]
pub struct PgRejectionRepository {
    pool: PgPool,
}

impl PgRejectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Explains why a status transition matched no row.
    async fn transition_error(&self, email_id: Uuid) -> RepositoryError {
        let status: Result<Option<String>, sqlx::Error> =
            sqlx::query_scalar("SELECT status FROM scheduled_rejection_emails WHERE id = $1")
                .bind(email_id)
                .fetch_optional(&self.pool)
                .await;
        match status {
            Ok(Some(status)) => RepositoryError::Terminal {
                email_id,
                status: status.parse().unwrap_or(RejectionEmailStatus::Failed),
            },
            Ok(None) => RepositoryError::NotFound(format!("rejection email {email_id}")),
            Err(e) => RepositoryError::Database(e),
        }
    }
}

#[async_trait]
impl RejectionRepository for PgRejectionRepository {
    async fn rejection_settings(
        &self,
        application_id: Uuid,
    ) -> Result<Option<OrganizationRejectionSettings>, RepositoryError> {
        let row: Option<(Uuid, Option<i32>, Option<bool>, Option<bool>)> = sqlx::query_as(
            r#"
            SELECT jp.organization_id,
                   s.rejection_delay_days,
                   s.business_days_only,
                   s.rejection_email_enabled
            FROM job_applications ja
            JOIN job_postings jp ON jp.id = ja.job_posting_id
            LEFT JOIN organization_rejection_settings s ON s.organization_id = jp.organization_id
            WHERE ja.id = $1
            "#,
        )
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await?;

        let (organization_id, delay_days, business_days_only, enabled) = row
            .ok_or_else(|| RepositoryError::NotFound(format!("application {application_id}")))?;

        Ok(match (delay_days, business_days_only, enabled) {
            (Some(rejection_delay_days), Some(business_days_only), Some(rejection_email_enabled)) => {
                Some(OrganizationRejectionSettings {
                    organization_id,
                    rejection_delay_days,
                    business_days_only,
                    rejection_email_enabled,
                })
            }
            _ => None,
        })
    }

    async fn schedule_pending(
        &self,
        new: NewScheduledRejection,
    ) -> Result<ScheduleResult, RepositoryError> {
        // The WHERE on the conflict branch keeps claimed and terminal rows untouched.
        let row: Option<ScheduledRejectionEmail> = sqlx::query_as(
            r#"
            INSERT INTO scheduled_rejection_emails
                (application_id, recipient_email, score, rejection_reason, scheduled_for, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            ON CONFLICT (application_id) DO UPDATE
            SET recipient_email = EXCLUDED.recipient_email,
                score = EXCLUDED.score,
                rejection_reason = EXCLUDED.rejection_reason,
                scheduled_for = EXCLUDED.scheduled_for,
                updated_at = now()
            WHERE scheduled_rejection_emails.status = 'pending'
            RETURNING *
            "#,
        )
        .bind(new.application_id)
        .bind(&new.recipient_email)
        .bind(new.score)
        .bind(&new.rejection_reason)
        .bind(new.scheduled_for)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            debug!(email_id = %row.id, application_id = %row.application_id, "Upserted pending rejection email");
            return Ok(ScheduleResult::Scheduled(row));
        }

        let status: String = sqlx::query_scalar(
            "SELECT status FROM scheduled_rejection_emails WHERE application_id = $1",
        )
        .bind(new.application_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ScheduleResult::AlreadyProcessed(
            status.parse().unwrap_or(RejectionEmailStatus::Failed),
        ))
    }

    async fn select_due(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<DueRejectionEmail>, RepositoryError> {
        Ok(sqlx::query_as::<_, DueRejectionEmail>(
            r#"
            SELECT sre.id AS email_id,
                   sre.application_id,
                   sre.recipient_email,
                   sre.scheduled_for,
                   COALESCE(
                       NULLIF(TRIM(CONCAT_WS(' ', cp.first_name, cp.last_name)), ''),
                       'Candidate'
                   ) AS candidate_name,
                   jp.title AS job_title,
                   o.name AS company_name
            FROM scheduled_rejection_emails sre
            JOIN job_applications ja ON ja.id = sre.application_id
            JOIN job_postings jp ON jp.id = ja.job_posting_id
            JOIN organizations o ON o.id = jp.organization_id
            LEFT JOIN candidate_profiles cp ON cp.id = ja.candidate_id
            WHERE sre.status = 'pending'
              AND sre.scheduled_for <= $1
            ORDER BY sre.scheduled_for ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn claim(&self, email_id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_rejection_emails
            SET status = 'processing', updated_at = now()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(email_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_sent(
        &self,
        email_id: Uuid,
        email_service_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let application_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE scheduled_rejection_emails
            SET status = 'sent',
                email_service_id = $2,
                sent_at = $3,
                error_message = NULL,
                updated_at = now()
            WHERE id = $1 AND status IN ('pending', 'processing')
            RETURNING application_id
            "#,
        )
        .bind(email_id)
        .bind(email_service_id)
        .bind(sent_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(application_id) = application_id else {
            tx.rollback().await?;
            return Err(self.transition_error(email_id).await);
        };

        sqlx::query(
            r#"
            UPDATE job_applications
            SET rejection_email_sent = true, status = 'rejected'
            WHERE id = $1
            "#,
        )
        .bind(application_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        email_id: Uuid,
        error_message: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_rejection_emails
            SET status = 'failed', error_message = $2, updated_at = now()
            WHERE id = $1 AND status IN ('pending', 'processing')
            "#,
        )
        .bind(email_id)
        .bind(error_message)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.transition_error(email_id).await);
        }
        Ok(())
    }
}
