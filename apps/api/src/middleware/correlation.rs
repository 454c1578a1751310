//! Correlation ids: one opaque id threaded through a request for log correlation.
//!
//! The id is taken from `x-correlation-id` when the caller supplies one, otherwise
//! generated. A fresh request id is minted for every request. Both are echoed as
//! response headers and recorded on a `tracing` span wrapping the handler.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{info_span, Instrument};
use uuid::Uuid;

pub const CORRELATION_HEADER: HeaderName = HeaderName::from_static("x-correlation-id");
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_CORRELATION_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

pub async fn correlation_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(&CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(accept_caller_id)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let request_id = Uuid::new_v4().to_string();

    request
        .extensions_mut()
        .insert(CorrelationId(correlation_id.clone()));
    request.extensions_mut().insert(RequestId(request_id.clone()));

    let span = info_span!(
        "request",
        correlation_id = %correlation_id,
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        headers.insert(CORRELATION_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Caller-supplied ids end up in logs and headers, so only short printable tokens are kept.
fn accept_caller_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let acceptable = !trimmed.is_empty()
        && trimmed.len() <= MAX_CORRELATION_ID_LEN
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));
    acceptable.then(|| trimmed.to_string())
}
