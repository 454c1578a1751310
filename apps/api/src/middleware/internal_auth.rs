//! Shared-secret guard for `/api/v1/internal/*`.
//!
//! Accepts `Authorization: Internal <token>` or `Authorization: Bearer <token>`.
//! The token is compared against `INTERNAL_API_SECRET` in constant time.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;
use tracing::warn;
use uuid::Uuid;

use crate::errors::{ApiError, AppError};
use crate::middleware::correlation::CorrelationId;
use crate::state::AppState;

pub async fn internal_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let correlation = request
        .extensions()
        .get::<CorrelationId>()
        .cloned()
        .unwrap_or_else(|| CorrelationId(Uuid::new_v4().to_string()));

    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(extract_token)
        .unwrap_or_default();

    if token.is_empty() {
        warn!("Internal auth failed: missing token");
        return Err(ApiError::new(&correlation, AppError::MissingInternalToken));
    }

    let Some(expected) = state.config.internal_api_secret.as_deref() else {
        return Err(ApiError::new(&correlation, AppError::InternalAuthNotConfigured));
    };

    if !tokens_match(expected, token) {
        warn!("Internal auth failed: invalid token");
        return Err(ApiError::new(&correlation, AppError::InvalidInternalToken));
    }

    Ok(next.run(request).await)
}

/// Strips the `Internal ` / `Bearer ` scheme. Any other scheme is passed through
/// untouched so it fails the comparison instead of reading as a missing token.
fn extract_token(header: &str) -> &str {
    let header = header.trim_start();
    header
        .strip_prefix("Internal ")
        .or_else(|| header.strip_prefix("Bearer "))
        .map(str::trim)
        .unwrap_or_else(|| header.trim_end())
}

fn tokens_match(expected: &str, provided: &str) -> bool {
    let expected = expected.as_bytes();
    let provided = provided.as_bytes();
    expected.len() == provided.len() && bool::from(expected.ct_eq(provided))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token_schemes() {
        assert_eq!(extract_token("Internal s3cret"), "s3cret");
        assert_eq!(extract_token("Bearer s3cret"), "s3cret");
        assert_eq!(extract_token("Internal    "), "");
        assert_eq!(extract_token("Basic abc"), "Basic abc");
    }

    #[test]
    fn test_tokens_match_requires_exact_bytes() {
        assert!(tokens_match("s3cret", "s3cret"));
        assert!(!tokens_match("s3cret", "s3cre"));
        assert!(!tokens_match("s3cret", "S3CRET"));
    }
}
