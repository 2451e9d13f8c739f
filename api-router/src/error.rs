use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::error::AppError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize, Clone)]
pub enum ApiError {
    #[error("Internal server error")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(msg) => Self::ValidationError(msg),
            AppError::NotFound(msg) => Self::NotFound(msg),
            AppError::ProviderTimeout { operation, waited } => {
                Self::UpstreamTimeout(format!("{operation} timed out after {waited:?}"))
            }
            // Provider and storage failures carry internal detail (hosts,
            // model names, SQL) that must not reach the client.
            other => {
                tracing::error!(error = ?other, "internal error");
                Self::InternalError("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            Self::ValidationError(message) => (StatusCode::BAD_REQUEST, message),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message),
            Self::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            Self::RateLimited(message) => (StatusCode::TOO_MANY_REQUESTS, message),
            Self::UpstreamTimeout(message) => (StatusCode::GATEWAY_TIMEOUT, message),
        };

        let body = ErrorResponse {
            error: message,
            status: "error".to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
    status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fmt::Debug, time::Duration};

    fn assert_status_code<T: IntoResponse + Debug>(response: T, expected_status: StatusCode) {
        let response = response.into_response();
        assert_eq!(response.status(), expected_status);
    }

    #[test]
    fn test_app_error_to_api_error_conversion() {
        let validation = AppError::Validation("question must not be empty".to_string());
        let api_error = ApiError::from(validation);
        assert!(
            matches!(api_error, ApiError::ValidationError(msg) if msg == "question must not be empty")
        );

        let timeout = AppError::ProviderTimeout {
            operation: "generation",
            waited: Duration::from_secs(30),
        };
        let api_error = ApiError::from(timeout);
        assert!(matches!(api_error, ApiError::UpstreamTimeout(_)));

        let internal = AppError::EmbeddingProvider("api key sk-secret rejected".to_string());
        let api_error = ApiError::from(internal);
        assert!(matches!(api_error, ApiError::InternalError(_)));
    }

    #[test]
    fn test_api_error_response_status_codes() {
        assert_status_code(
            ApiError::InternalError("boom".to_string()),
            StatusCode::INTERNAL_SERVER_ERROR,
        );
        assert_status_code(
            ApiError::ValidationError("bad input".to_string()),
            StatusCode::BAD_REQUEST,
        );
        assert_status_code(
            ApiError::NotFound("missing".to_string()),
            StatusCode::NOT_FOUND,
        );
        assert_status_code(
            ApiError::Unauthorized("not allowed".to_string()),
            StatusCode::UNAUTHORIZED,
        );
        assert_status_code(
            ApiError::RateLimited("slow down".to_string()),
            StatusCode::TOO_MANY_REQUESTS,
        );
        assert_status_code(
            ApiError::UpstreamTimeout("generation timed out".to_string()),
            StatusCode::GATEWAY_TIMEOUT,
        );
    }

    #[test]
    fn test_internal_error_sanitization() {
        let api_error = ApiError::InternalError("db password incorrect".to_string());
        assert_eq!(api_error.to_string(), "Internal server error");
        assert_status_code(api_error, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
