//! Success envelope shared by the internal endpoints, plus lenient JSON body parsing.

use std::time::Instant;

use axum::Json;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::errors::AppError;
use crate::middleware::correlation::CorrelationId;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub correlation_id: String,
    pub timestamp: DateTime<Utc>,
    pub processing_time_ms: u64,
}

/// `{success: true, data, metadata}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub metadata: ResponseMetadata,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, correlation: &CorrelationId, started: Instant) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            metadata: ResponseMetadata {
                correlation_id: correlation.0.clone(),
                timestamp: Utc::now(),
                processing_time_ms: started.elapsed().as_millis() as u64,
            },
        })
    }
}

/// Parses a JSON body, treating an empty body as `T::default()`.
pub fn parse_optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    parse_json(body)
}

/// Parses a required JSON body. Errors become `VALIDATION_ERROR` inside the
/// standard envelope instead of axum's plain-text rejection.
pub fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))
}
