use std::time::Duration;

use anyhow::{Context, Result};

use crate::rejections::dispatcher::{DispatchSettings, DEFAULT_BATCH_DELAY, DEFAULT_BATCH_SIZE};

const DEFAULT_FROM_EMAIL: &str = "noreply@recruitseed.com";
const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub resend_api_key: String,
    pub resend_api_url: String,
    pub default_from_email: String,
    /// Shared secret for `/api/v1/internal/*`. When unset, internal routes refuse every call.
    pub internal_api_secret: Option<String>,
    pub rejection_batch_size: usize,
    pub rejection_batch_delay: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            resend_api_key: require_env("RESEND_API_KEY")?,
            resend_api_url: std::env::var("RESEND_API_URL")
                .unwrap_or_else(|_| DEFAULT_RESEND_API_URL.to_string()),
            default_from_email: std::env::var("DEFAULT_FROM_EMAIL")
                .unwrap_or_else(|_| DEFAULT_FROM_EMAIL.to_string()),
            internal_api_secret: optional_env("INTERNAL_API_SECRET"),
            rejection_batch_size: match optional_env("REJECTION_BATCH_SIZE") {
                Some(raw) => {
                    let size = raw
                        .parse::<usize>()
                        .context("REJECTION_BATCH_SIZE must be a positive integer")?;
                    anyhow::ensure!(size > 0, "REJECTION_BATCH_SIZE must be greater than zero");
                    size
                }
                None => DEFAULT_BATCH_SIZE,
            },
            rejection_batch_delay: match optional_env("REJECTION_BATCH_DELAY_MS") {
                Some(raw) => Duration::from_millis(
                    raw.parse::<u64>()
                        .context("REJECTION_BATCH_DELAY_MS must be a number of milliseconds")?,
                ),
                None => DEFAULT_BATCH_DELAY,
            },
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            batch_size: self.rejection_batch_size,
            batch_delay: self.rejection_batch_delay,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
