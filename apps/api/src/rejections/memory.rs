//! In-process `RejectionRepository` used by the pipeline and router tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::rejection::{
    DueRejectionEmail, NewScheduledRejection, OrganizationRejectionSettings,
    RejectionEmailStatus, ScheduledRejectionEmail,
};
use crate::rejections::repository::{RejectionRepository, RepositoryError, ScheduleResult};

/// The slice of `job_applications` (plus joined names) the pipeline touches.
#[derive(Debug, Clone)]
pub struct ApplicationRecord {
    pub organization_id: Uuid,
    pub status: String,
    pub rejection_email_sent: bool,
    pub candidate_name: String,
    pub job_title: String,
    pub company_name: String,
}

#[derive(Default)]
struct Store {
    applications: HashMap<Uuid, ApplicationRecord>,
    settings: HashMap<Uuid, OrganizationRejectionSettings>,
    emails: HashMap<Uuid, ScheduledRejectionEmail>,
    fail_select: bool,
    fail_claim: HashSet<Uuid>,
    fail_mark_sent: HashSet<Uuid>,
}

#[derive(Default)]
pub struct InMemoryRejectionRepository {
    store: Mutex<Store>,
}

fn injected_failure() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::PoolTimedOut)
}

impl InMemoryRejectionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_application(&self, organization_id: Uuid, candidate_name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.store.lock().unwrap().applications.insert(
            id,
            ApplicationRecord {
                organization_id,
                status: "reviewing".to_string(),
                rejection_email_sent: false,
                candidate_name: candidate_name.to_string(),
                job_title: "Backend Engineer".to_string(),
                company_name: "Acme".to_string(),
            },
        );
        id
    }

    pub fn set_settings(&self, settings: OrganizationRejectionSettings) {
        self.store
            .lock()
            .unwrap()
            .settings
            .insert(settings.organization_id, settings);
    }

    /// Inserts an email row for a fresh application, bypassing the scheduling rule.
    pub fn seed_email(
        &self,
        recipient_email: &str,
        scheduled_for: DateTime<Utc>,
        status: RejectionEmailStatus,
    ) -> Uuid {
        let application_id = self.add_application(Uuid::new_v4(), "Jamie Doe");
        let now = Utc::now();
        let id = Uuid::new_v4();
        self.store.lock().unwrap().emails.insert(
            id,
            ScheduledRejectionEmail {
                id,
                application_id,
                recipient_email: recipient_email.to_string(),
                score: 20,
                rejection_reason: None,
                scheduled_for,
                status: status.as_str().to_string(),
                email_service_id: None,
                sent_at: None,
                error_message: None,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    pub fn email(&self, email_id: Uuid) -> Option<ScheduledRejectionEmail> {
        self.store.lock().unwrap().emails.get(&email_id).cloned()
    }

    pub fn application(&self, application_id: Uuid) -> Option<ApplicationRecord> {
        self.store
            .lock()
            .unwrap()
            .applications
            .get(&application_id)
            .cloned()
    }

    pub fn set_status(&self, email_id: Uuid, status: RejectionEmailStatus) {
        if let Some(email) = self.store.lock().unwrap().emails.get_mut(&email_id) {
            email.status = status.as_str().to_string();
        }
    }

    pub fn fail_selection(&self) {
        self.store.lock().unwrap().fail_select = true;
    }

    pub fn fail_claim_for(&self, email_id: Uuid) {
        self.store.lock().unwrap().fail_claim.insert(email_id);
    }

    pub fn fail_mark_sent_for(&self, email_id: Uuid) {
        self.store.lock().unwrap().fail_mark_sent.insert(email_id);
    }

    fn transition(
        store: &mut Store,
        email_id: Uuid,
    ) -> Result<&mut ScheduledRejectionEmail, RepositoryError> {
        let email = store
            .emails
            .get_mut(&email_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("rejection email {email_id}")))?;
        let status = email.status();
        if status.is_terminal() {
            return Err(RepositoryError::Terminal { email_id, status });
        }
        Ok(email)
    }
}

#[async_trait]
impl RejectionRepository for InMemoryRejectionRepository {
    async fn rejection_settings(
        &self,
        application_id: Uuid,
    ) -> Result<Option<OrganizationRejectionSettings>, RepositoryError> {
        let store = self.store.lock().unwrap();
        let application = store
            .applications
            .get(&application_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("application {application_id}")))?;
        Ok(store.settings.get(&application.organization_id).cloned())
    }

    async fn schedule_pending(
        &self,
        new: NewScheduledRejection,
    ) -> Result<ScheduleResult, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        let now = Utc::now();

        if let Some(existing) = store
            .emails
            .values_mut()
            .find(|email| email.application_id == new.application_id)
        {
            if existing.status() != RejectionEmailStatus::Pending {
                return Ok(ScheduleResult::AlreadyProcessed(existing.status()));
            }
            existing.recipient_email = new.recipient_email;
            existing.score = new.score;
            existing.rejection_reason = new.rejection_reason;
            existing.scheduled_for = new.scheduled_for;
            existing.updated_at = now;
            return Ok(ScheduleResult::Scheduled(existing.clone()));
        }

        let id = Uuid::new_v4();
        let row = ScheduledRejectionEmail {
            id,
            application_id: new.application_id,
            recipient_email: new.recipient_email,
            score: new.score,
            rejection_reason: new.rejection_reason,
            scheduled_for: new.scheduled_for,
            status: RejectionEmailStatus::Pending.as_str().to_string(),
            email_service_id: None,
            sent_at: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        store.emails.insert(id, row.clone());
        Ok(ScheduleResult::Scheduled(row))
    }

    async fn select_due(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<DueRejectionEmail>, RepositoryError> {
        let store = self.store.lock().unwrap();
        if store.fail_select {
            return Err(injected_failure());
        }

        let mut due: Vec<DueRejectionEmail> = store
            .emails
            .values()
            .filter(|email| {
                email.status() == RejectionEmailStatus::Pending && email.scheduled_for <= now
            })
            .filter_map(|email| {
                let application = store.applications.get(&email.application_id)?;
                Some(DueRejectionEmail {
                    email_id: email.id,
                    application_id: email.application_id,
                    recipient_email: email.recipient_email.clone(),
                    scheduled_for: email.scheduled_for,
                    candidate_name: application.candidate_name.clone(),
                    job_title: application.job_title.clone(),
                    company_name: application.company_name.clone(),
                })
            })
            .collect();
        due.sort_by_key(|email| email.scheduled_for);
        Ok(due)
    }

    async fn claim(&self, email_id: Uuid) -> Result<bool, RepositoryError> {
        let mut store = self.store.lock().unwrap();
        if store.fail_claim.contains(&email_id) {
            return Err(injected_failure());
        }
        match store.emails.get_mut(&email_id) {
            Some(email) if email.status() == RejectionEmailStatus::Pending => {
                email.status = RejectionEmailStatus::Processing.as_str().to_string();
                email.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_sent(
        &self,
        email_id: Uuid,
        email_service_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        if store.fail_mark_sent.contains(&email_id) {
            return Err(injected_failure());
        }

        let email = Self::transition(&mut store, email_id)?;
        email.status = RejectionEmailStatus::Sent.as_str().to_string();
        email.email_service_id = Some(email_service_id.to_string());
        email.sent_at = Some(sent_at);
        email.error_message = None;
        email.updated_at = Utc::now();
        let application_id = email.application_id;

        if let Some(application) = store.applications.get_mut(&application_id) {
            application.rejection_email_sent = true;
            application.status = "rejected".to_string();
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        email_id: Uuid,
        error_message: &str,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        let email = Self::transition(&mut store, email_id)?;
        email.status = RejectionEmailStatus::Failed.as_str().to_string();
        email.error_message = Some(error_message.to_string());
        email.updated_at = Utc::now();
        Ok(())
    }
}
