//! Scheduling rule: when an auto-rejected application should receive its
//! rejection email.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::rejection::{NewScheduledRejection, OrganizationRejectionSettings};
use crate::rejections::repository::{RejectionRepository, RepositoryError, ScheduleResult};

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("rejection email for application {application_id} is already {status}")]
    AlreadyProcessed { application_id: Uuid, status: String },

    #[error("rejection delay of {delay_days} days exceeds the maximum of {MAX_DELAY_DAYS}")]
    DelayOutOfRange { delay_days: u32 },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Upper bound on an organization's rejection delay. The settings table
/// enforces the same limit.
pub const MAX_DELAY_DAYS: u32 = 365;

/// Effective rejection policy for one organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectionPolicy {
    pub delay_days: u32,
    pub business_days_only: bool,
    pub enabled: bool,
}

impl Default for RejectionPolicy {
    fn default() -> Self {
        Self {
            delay_days: 7,
            business_days_only: false,
            enabled: true,
        }
    }
}

impl From<&OrganizationRejectionSettings> for RejectionPolicy {
    fn from(settings: &OrganizationRejectionSettings) -> Self {
        Self {
            delay_days: settings.rejection_delay_days.max(0) as u32,
            business_days_only: settings.business_days_only,
            enabled: settings.rejection_email_enabled,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    pub application_id: Uuid,
    pub candidate_email: String,
    pub score: i32,
    pub rejection_reason: Option<String>,
}

impl ScheduleRequest {
    /// Caller-side input checks: a plausible address and a 0-100 score.
    pub fn validate(&self) -> Result<(), String> {
        let email = self.candidate_email.trim();
        let plausible = email
            .split_once('@')
            .is_some_and(|(local, domain)| {
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
            })
            && !email.chars().any(char::is_whitespace);
        if !plausible {
            return Err(format!("'{}' is not a valid email address", self.candidate_email));
        }
        if !(0..=100).contains(&self.score) {
            return Err(format!("score must be between 0 and 100, got {}", self.score));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScheduleOutcome {
    Scheduled {
        email_id: Uuid,
        scheduled_for: DateTime<Utc>,
    },
    Disabled,
}

fn is_weekend(at: &DateTime<Utc>) -> bool {
    matches!(at.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Send time for a rejection decided at `now`.
///
/// Business-day delays count Monday to Friday only and keep the time of day.
/// A zero delay landing on a weekend moves to Monday. Delays above
/// `MAX_DELAY_DAYS` are refused.
pub fn compute_scheduled_for(
    now: DateTime<Utc>,
    policy: &RejectionPolicy,
) -> Result<DateTime<Utc>, ScheduleError> {
    let out_of_range = || ScheduleError::DelayOutOfRange {
        delay_days: policy.delay_days,
    };
    if policy.delay_days > MAX_DELAY_DAYS {
        return Err(out_of_range());
    }
    let one_day = |at: DateTime<Utc>| at.checked_add_signed(Duration::days(1)).ok_or_else(out_of_range);

    if !policy.business_days_only {
        return now
            .checked_add_signed(Duration::days(i64::from(policy.delay_days)))
            .ok_or_else(out_of_range);
    }

    let mut at = now;
    let mut remaining = policy.delay_days;
    while remaining > 0 {
        at = one_day(at)?;
        if !is_weekend(&at) {
            remaining -= 1;
        }
    }
    while is_weekend(&at) {
        at = one_day(at)?;
    }
    Ok(at)
}

/// Applies the owning organization's policy and upserts the pending email.
pub async fn schedule_rejection(
    repository: &dyn RejectionRepository,
    request: ScheduleRequest,
    now: DateTime<Utc>,
) -> Result<ScheduleOutcome, ScheduleError> {
    let policy = repository
        .rejection_settings(request.application_id)
        .await?
        .as_ref()
        .map(RejectionPolicy::from)
        .unwrap_or_default();

    if !policy.enabled {
        info!(
            application_id = %request.application_id,
            "Rejection emails disabled for organization, not scheduling"
        );
        return Ok(ScheduleOutcome::Disabled);
    }

    let scheduled_for = compute_scheduled_for(now, &policy)?;
    let result = repository
        .schedule_pending(NewScheduledRejection {
            application_id: request.application_id,
            recipient_email: request.candidate_email,
            score: request.score,
            rejection_reason: request.rejection_reason,
            scheduled_for,
        })
        .await?;

    match result {
        ScheduleResult::Scheduled(row) => {
            info!(
                email_id = %row.id,
                application_id = %row.application_id,
                scheduled_for = %row.scheduled_for,
                "Rejection email scheduled"
            );
            Ok(ScheduleOutcome::Scheduled {
                email_id: row.id,
                scheduled_for: row.scheduled_for,
            })
        }
        ScheduleResult::AlreadyProcessed(status) => Err(ScheduleError::AlreadyProcessed {
            application_id: request.application_id,
            status: status.to_string(),
        }),
    }
}
