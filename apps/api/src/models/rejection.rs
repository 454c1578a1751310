use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a scheduled rejection email.
///
/// `pending -> processing -> sent | failed`. `processing` is held by exactly one
/// dispatcher run; `sent` and `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionEmailStatus {
    Pending,
    Processing,
    Sent,
    Failed,
}

impl RejectionEmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionEmailStatus::Pending => "pending",
            RejectionEmailStatus::Processing => "processing",
            RejectionEmailStatus::Sent => "sent",
            RejectionEmailStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RejectionEmailStatus::Sent | RejectionEmailStatus::Failed)
    }
}

impl fmt::Display for RejectionEmailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RejectionEmailStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RejectionEmailStatus::Pending),
            "processing" => Ok(RejectionEmailStatus::Processing),
            "sent" => Ok(RejectionEmailStatus::Sent),
            "failed" => Ok(RejectionEmailStatus::Failed),
            other => Err(format!("unknown rejection email status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScheduledRejectionEmail {
    pub id: Uuid,
    pub application_id: Uuid,
    pub recipient_email: String,
    pub score: i32,
    pub rejection_reason: Option<String>,
    pub scheduled_for: DateTime<Utc>,
    pub status: String,
    pub email_service_id: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledRejectionEmail {
    /// Parsed status. Rows with an unrecognised status are treated as terminal
    /// failures so nothing ever re-sends them.
    pub fn status(&self) -> RejectionEmailStatus {
        self.status.parse().unwrap_or(RejectionEmailStatus::Failed)
    }
}

/// Per-organization rejection policy as stored by org admins.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrganizationRejectionSettings {
    pub organization_id: Uuid,
    pub rejection_delay_days: i32,
    pub business_days_only: bool,
    pub rejection_email_enabled: bool,
}

/// A due email joined with the display fields the rejection template needs.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DueRejectionEmail {
    pub email_id: Uuid,
    pub application_id: Uuid,
    pub recipient_email: String,
    pub scheduled_for: DateTime<Utc>,
    pub candidate_name: String,
    pub job_title: String,
    pub company_name: String,
}

/// Input to the scheduling upsert.
#[derive(Debug, Clone)]
pub struct NewScheduledRejection {
    pub application_id: Uuid,
    pub recipient_email: String,
    pub score: i32,
    pub rejection_reason: Option<String>,
    pub scheduled_for: DateTime<Utc>,
}
