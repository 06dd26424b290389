//! HTTP error response conversion
//!
//! This module provides HTTP-specific error response conversion for AppError.
//!
//! **Preferred handler pattern:** Return `Result<impl IntoResponse, HttpAppError>`. Use
//! `AppError` (or types that implement `Into<AppError>`) for errors and `.map_err(Into::into)`
//! so they become `HttpAppError` and render consistently (status, body, logging).
//!
//! Two error shapes deviate from the `ErrorResponse` envelope because upload
//! clients depend on them: validation failures render as 422 with a flat
//! `{"errors": [...]}` list, and retrieval misses / access denials render as
//! bare status codes with no body.

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use updraft_core::{AppError, ErrorMetadata, LogLevel};
use updraft_storage::StoreError;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    /// Suggested action for the client (e.g., "Wait 60s and retry")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ErrorResponse {
    /// Create a simple error response with default values
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            error_type: None,
            code: code.into(),
            recoverable: false,
            suggested_action: None,
        }
    }
}

/// 422 body for rejected uploads: a flat list of human-readable messages.
#[derive(Debug, Serialize, ToSchema)]
pub struct FailedResponse {
    pub errors: Vec<String>,
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from updraft-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

impl From<StoreError> for HttpAppError {
    fn from(err: StoreError) -> Self {
        HttpAppError(err.into())
    }
}

/// Convert JSON body deserialization failures into a 400 with our ErrorResponse format.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidParameters(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// JSON body extractor that returns our ErrorResponse format (400 + JSON) on deserialization failure.
/// Use this instead of `Json<T>` when you want a consistent API error shape for invalid bodies.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        match app_error {
            AppError::ValidationFailed(failure) => (
                status,
                Json(FailedResponse {
                    errors: failure.messages(),
                }),
            )
                .into_response(),
            AppError::FileMissing => (
                status,
                Json(FailedResponse {
                    errors: vec![app_error.client_message()],
                }),
            )
                .into_response(),
            AppError::NotFound(_) | AppError::InvalidAccess(_) => status.into_response(),
            _ => {
                // Always hide details in production for security; in non-production,
                // only show details for non-sensitive errors.
                let body = if is_production_env() || app_error.is_sensitive() {
                    Json(ErrorResponse {
                        error: app_error.client_message(),
                        details: None,
                        error_type: None,
                        code: app_error.error_code().to_string(),
                        recoverable: app_error.is_recoverable(),
                        suggested_action: app_error.suggested_action().map(String::from),
                    })
                } else {
                    Json(ErrorResponse {
                        error: app_error.client_message(),
                        details: Some(app_error.detailed_message()),
                        error_type: Some(app_error.error_type().to_string()),
                        code: app_error.error_code().to_string(),
                        recoverable: app_error.is_recoverable(),
                        suggested_action: app_error.suggested_action().map(String::from),
                    })
                };
                (status, body).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use updraft_core::ValidationFailure;

    #[test]
    fn store_error_not_found_maps_to_not_found() {
        let store_err = StoreError::NotFound("original/abc.png".to_string());
        let HttpAppError(app_err) = store_err.into();
        match app_err {
            AppError::NotFound(msg) => assert_eq!(msg, "original/abc.png"),
            _ => panic!("Expected NotFound variant"),
        }
    }

    #[test]
    fn store_error_failure_maps_to_store() {
        let store_err = StoreError::StoreFailed("disk full".to_string());
        let HttpAppError(app_err) = store_err.into();
        match app_err {
            AppError::Store(msg) => assert!(msg.contains("disk full")),
            _ => panic!("Expected Store variant"),
        }
    }

    #[tokio::test]
    async fn validation_failure_renders_flat_errors_list() {
        let failure = ValidationFailure::single("file", "too big");
        let response = HttpAppError(AppError::ValidationFailed(failure)).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json: serde_json::Value = serde_json::from_slice(&bytes).expect("parse body");
        assert_eq!(json["errors"], serde_json::json!(["too big"]));
    }

    #[tokio::test]
    async fn file_missing_renders_flat_errors_list() {
        let response = HttpAppError(AppError::FileMissing).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json: serde_json::Value = serde_json::from_slice(&bytes).expect("parse body");
        assert_eq!(json["errors"].as_array().map(|a| a.len()), Some(1));
    }

    #[tokio::test]
    async fn not_found_renders_bare_status() {
        let response = HttpAppError(AppError::NotFound("gone".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn invalid_access_renders_bare_status() {
        let response = HttpAppError(AppError::InvalidAccess("denied".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    /// Verifies the envelope contract: serialized ErrorResponse has "error",
    /// "code", "recoverable", and optionally "details" / "error_type" / "suggested_action".
    #[test]
    fn error_response_shape() {
        let response = ErrorResponse {
            error: "Internal server error".to_string(),
            details: None,
            error_type: None,
            code: "INTERNAL_ERROR".to_string(),
            recoverable: true,
            suggested_action: Some("Retry after a short delay".to_string()),
        };
        let json = serde_json::to_value(&response).expect("serialize");
        assert!(json.get("error").and_then(|v| v.as_str()).is_some());
        assert_eq!(
            json.get("code").and_then(|v| v.as_str()),
            Some("INTERNAL_ERROR")
        );
        assert!(json.get("details").is_none());
        assert!(json.get("error_type").is_none());
    }
}
