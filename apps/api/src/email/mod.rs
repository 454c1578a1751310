//! Transactional email: template rendering and the provider seam.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[cfg(test)]
pub mod fake;
pub mod resend;
pub mod templates;

pub use templates::CANDIDATE_REJECTION;

/// Template variables keyed by placeholder name.
pub type TemplateVars = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("email template not found: {0}")]
    UnknownTemplate(String),

    #[error("missing required template variable '{variable}' for template {template}")]
    MissingVariable { template: String, variable: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("email provider error (status {status}): {message}")]
    Provider { status: u16, message: String },
}

/// Context carried alongside a send for logging, tagging and provider-side dedup.
#[derive(Debug, Clone, Default)]
pub struct EmailMetadata {
    pub correlation_id: Option<String>,
    pub application_id: Option<Uuid>,
    /// Forwarded as the provider's `Idempotency-Key`. Sends carrying one may be retried.
    pub idempotency_key: Option<String>,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Renders `template_id` with `vars` and sends it to `to`.
    /// Returns the provider's message id.
    async fn send_templated(
        &self,
        template_id: &str,
        vars: &TemplateVars,
        to: &str,
        metadata: &EmailMetadata,
    ) -> Result<String, EmailError>;
}
