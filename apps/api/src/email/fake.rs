//! Scripted `EmailSender` for dispatcher and router tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::email::templates::render_email;
use crate::email::{EmailError, EmailMetadata, EmailSender, TemplateVars};

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub idempotency_key: Option<String>,
}

/// Renders like the real client, then succeeds unless the recipient is
/// scripted to fail.
#[derive(Default)]
pub struct ScriptedEmailSender {
    failing: HashSet<String>,
    latency: Option<Duration>,
    sent: Mutex<Vec<SentEmail>>,
}

impl ScriptedEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for<I, S>(recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            failing: recipients.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for ScriptedEmailSender {
    async fn send_templated(
        &self,
        template_id: &str,
        vars: &TemplateVars,
        to: &str,
        metadata: &EmailMetadata,
    ) -> Result<String, EmailError> {
        let rendered = render_email(template_id, vars)?;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.contains(to) {
            return Err(EmailError::Provider {
                status: 422,
                message: format!("recipient {to} rejected"),
            });
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(SentEmail {
            to: to.to_string(),
            subject: rendered.subject,
            idempotency_key: metadata.idempotency_key.clone(),
        });
        Ok(format!("msg_{}", sent.len()))
    }
}
