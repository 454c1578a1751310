use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::middleware::correlation::CorrelationId;
use crate::rejections::dispatcher::DispatchError;
use crate::rejections::repository::RepositoryError;
use crate::rejections::schedule::ScheduleError;
use crate::resumes::ResumeError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Missing internal token")]
    MissingInternalToken,

    #[error("Invalid internal token")]
    InvalidInternalToken,

    #[error("Internal authentication not configured")]
    InternalAuthNotConfigured,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("LLM error: {0}")]
    Llm(String),
}

impl AppError {
    /// Status, stable machine-readable code and caller-facing message.
    /// Server-side details are logged here and never leave the process.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::MissingInternalToken => (
                StatusCode::UNAUTHORIZED,
                "MISSING_INTERNAL_TOKEN",
                "Internal token required. Include 'Authorization: Internal <token>' header"
                    .to_string(),
            ),
            AppError::InvalidInternalToken => (
                StatusCode::UNAUTHORIZED,
                "INVALID_INTERNAL_TOKEN",
                "Invalid internal authentication token".to_string(),
            ),
            AppError::InternalAuthNotConfigured => {
                tracing::error!("INTERNAL_API_SECRET is not configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_AUTH_NOT_CONFIGURED",
                    "Internal authentication not configured".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Processing(e) => {
                tracing::error!("Processing error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PROCESSING_ERROR",
                    "Failed to process request".to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
        }
    }

    fn body(&self) -> (StatusCode, Value) {
        let (status, code, message) = self.parts();
        let body = json!({
            "success": false,
            "error": {
                "code": code,
                "message": message
            }
        });
        (status, body)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.body();
        (status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => AppError::NotFound(what),
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::AlreadyProcessed { .. } => AppError::Conflict(err.to_string()),
            ScheduleError::DelayOutOfRange { .. } => AppError::UnprocessableEntity(err.to_string()),
            ScheduleError::Repository(inner) => inner.into(),
        }
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<ResumeError> for AppError {
    fn from(err: ResumeError) -> Self {
        match err {
            ResumeError::LegacyDoc | ResumeError::UnsupportedType(_) | ResumeError::InvalidUtf8 => {
                AppError::Validation(err.to_string())
            }
            ResumeError::Pdf(_) | ResumeError::EmptyText => {
                AppError::UnprocessableEntity(err.to_string())
            }
            ResumeError::Llm(inner) => AppError::Llm(inner.to_string()),
        }
    }
}

/// An `AppError` tagged with the request's correlation id, rendered as the
/// `{success, error, correlationId}` envelope.
#[derive(Debug)]
pub struct ApiError {
    pub correlation_id: String,
    pub error: AppError,
}

impl ApiError {
    pub fn new(correlation: &CorrelationId, error: impl Into<AppError>) -> Self {
        Self {
            correlation_id: correlation.0.clone(),
            error: error.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, mut body) = self.error.body();
        body["correlationId"] = Value::String(self.correlation_id);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_repository_not_found_maps_to_404() {
        let err: AppError = RepositoryError::NotFound("application x".to_string()).into();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.parts().0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_already_processed_maps_to_conflict() {
        let err: AppError = ScheduleError::AlreadyProcessed {
            application_id: Uuid::nil(),
            status: "sent".to_string(),
        }
        .into();
        let (status, code, _) = err.parts();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "CONFLICT");
    }

    #[test]
    fn test_delay_out_of_range_is_unprocessable() {
        let err: AppError = ScheduleError::DelayOutOfRange { delay_days: 9000 }.into();
        let (status, code, message) = err.parts();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(code, "UNPROCESSABLE_ENTITY");
        assert!(message.contains("9000"));
    }

    #[test]
    fn test_database_message_is_generic() {
        let err = AppError::Database("connection refused on 10.0.0.3".to_string());
        let (_, body) = err.body();
        assert_eq!(body["error"]["code"], "DATABASE_ERROR");
        assert_eq!(body["error"]["message"], "A database error occurred");
        assert_eq!(body["success"], false);
    }

    #[test]
    fn test_resume_errors_map_to_client_statuses() {
        let doc: AppError = ResumeError::LegacyDoc.into();
        assert_eq!(doc.parts().0, StatusCode::BAD_REQUEST);
        let empty: AppError = ResumeError::EmptyText.into();
        assert_eq!(empty.parts().1, "UNPROCESSABLE_ENTITY");
    }

    #[tokio::test]
    async fn test_api_error_carries_correlation_id() {
        let correlation = CorrelationId("corr-123".to_string());
        let response = ApiError::new(&correlation, AppError::MissingInternalToken).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["correlationId"], "corr-123");
        assert_eq!(body["error"]["code"], "MISSING_INTERNAL_TOKEN");
        assert_eq!(body["success"], false);
    }
}
