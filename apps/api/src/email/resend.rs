//! Resend HTTP client. The only module that talks to the email provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::email::templates::render_email;
use crate::email::{EmailError, EmailMetadata, EmailSender, TemplateVars};

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
    tags: Vec<Tag<'a>>,
}

#[derive(Debug, Serialize)]
struct Tag<'a> {
    name: &'a str,
    value: String,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResendErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct ResendClient {
    client: Client,
    api_key: String,
    api_url: String,
    from: String,
    retry_backoff: Duration,
}

impl ResendClient {
    pub fn new(api_key: String, api_url: &str, from: String) -> Result<Self, EmailError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            from,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        })
    }

    #[cfg(test)]
    fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}

#[async_trait]
impl EmailSender for ResendClient {
    /// Renders and posts the email. Retries on transport errors, 429 and 5xx,
    /// but only when the send carries an idempotency key so a retry can never
    /// deliver twice.
    async fn send_templated(
        &self,
        template_id: &str,
        vars: &TemplateVars,
        to: &str,
        metadata: &EmailMetadata,
    ) -> Result<String, EmailError> {
        let rendered = render_email(template_id, vars)?;

        let mut tags = vec![Tag {
            name: "template",
            value: template_id.to_string(),
        }];
        if let Some(application_id) = metadata.application_id {
            tags.push(Tag {
                name: "application_id",
                value: application_id.to_string(),
            });
        }
        let body = SendEmailRequest {
            from: &self.from,
            to: [to],
            subject: &rendered.subject,
            html: &rendered.html,
            text: &rendered.text,
            tags,
        };

        let attempts = if metadata.idempotency_key.is_some() {
            MAX_RETRIES
        } else {
            1
        };
        let url = format!("{}/emails", self.api_url);
        let mut last_error: Option<EmailError> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.retry_backoff * (1 << (attempt - 1));
                warn!(
                    recipient = %to,
                    correlation_id = metadata.correlation_id.as_deref().unwrap_or(""),
                    "Email send attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body);
            if let Some(key) = &metadata.idempotency_key {
                request = request.header("Idempotency-Key", key);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(EmailError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let raw = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ResendErrorBody>(&raw)
                    .map(|e| e.message)
                    .unwrap_or(raw);
                let error = EmailError::Provider {
                    status: status.as_u16(),
                    message,
                };
                if status.as_u16() == 429 || status.is_server_error() {
                    last_error = Some(error);
                    continue;
                }
                return Err(error);
            }

            // A 2xx means delivered, whatever the body holds.
            let raw = response.text().await.unwrap_or_default();
            let provider_id = match serde_json::from_str::<SendEmailResponse>(&raw) {
                Ok(sent) => sent.id,
                Err(e) => {
                    warn!(recipient = %to, error = %e, "Unreadable provider response for accepted email");
                    None
                }
            }
            .unwrap_or_else(|| "unknown".to_string());
            info!(
                provider_id = %provider_id,
                recipient = %to,
                template = template_id,
                correlation_id = metadata.correlation_id.as_deref().unwrap_or(""),
                "Email sent"
            );
            return Ok(provider_id);
        }

        Err(last_error.unwrap_or(EmailError::Provider {
            status: 0,
            message: "no send attempt was made".to_string(),
        }))
    }
}
