/*
 * Responsibility
 * - The one application error type (AppError) every handler/extractor/middleware returns
 * - IntoResponse: HTTP status + failure envelope {success:false, code, error, details?}
 * - Conversions from the per-layer errors; internal detail is logged, never returned
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::repos::error::RepoError;
use crate::services::cache::CacheError;
use crate::services::content::GeneratorError;
use crate::services::record_id::RecordIdError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: &'static str,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("invalid or expired credential")]
    InvalidCredential,
    #[error("forbidden: requires {required}")]
    Forbidden { required: &'static str },
    #[error("malformed identifier: {0}")]
    MalformedIdentifier(#[from] RecordIdError),
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<String>,
    },
    #[error("{resource} not found")]
    NotFound { resource: &'static str },
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("cannot move {resource} from {from} to {to}")]
    InvalidTransition {
        resource: &'static str,
        from: String,
        to: String,
    },
    #[error("too many requests")]
    TooManyRequests,
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn validation_with(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated | AppError::InvalidCredential => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::MalformedIdentifier(_) | AppError::Validation { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "UNAUTHENTICATED",
            AppError::InvalidCredential => "INVALID_CREDENTIAL",
            AppError::Forbidden { .. } => "FORBIDDEN",
            AppError::MalformedIdentifier(_) => "MALFORMED_IDENTIFIER",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::TooManyRequests => "TOO_MANY_REQUESTS",
            AppError::Internal => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let details = match &self {
            AppError::Validation { details, .. } => details.clone(),
            _ => None,
        };

        let body = ErrorResponse {
            success: false,
            code,
            error: self.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        tracing::error!(error = %e, "store operation failed");
        AppError::Internal
    }
}

impl From<CacheError> for AppError {
    fn from(e: CacheError) -> Self {
        tracing::error!(error = %e, "cache operation failed");
        AppError::Internal
    }
}

impl From<GeneratorError> for AppError {
    fn from(e: GeneratorError) -> Self {
        tracing::error!(error = %e, "content generation failed");
        AppError::Internal
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        tracing::error!(error = %e, "document encoding failed");
        AppError::Internal
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn renders_the_failure_envelope() {
        let (status, body) = render(AppError::not_found("course")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["error"], "course not found");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn validation_may_carry_details() {
        let (status, body) =
            render(AppError::validation_with("invalid body", "missing field `title`")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"], "missing field `title`");
    }

    #[tokio::test]
    async fn store_failures_are_opaque() {
        let err = AppError::from(RepoError::Timeout(Duration::from_secs(5)));
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal server error");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn wrong_methods_render_405() {
        let (status, body) = render(AppError::MethodNotAllowed).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["code"], "METHOD_NOT_ALLOWED");
    }

    #[test]
    fn lifecycle_conflicts_map_to_409() {
        let err = AppError::InvalidTransition {
            resource: "course",
            from: "archived".to_string(),
            to: "published".to_string(),
        };
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "cannot move course from archived to published");
    }
}
