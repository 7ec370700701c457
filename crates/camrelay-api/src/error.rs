//! API error types and conversions

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use camrelay_core::{ForwardError, RegistryError};
use serde::Serialize;
use thiserror::Error;

/// API error type that converts to HTTP responses
#[derive(Debug, Error)]
pub enum ApiError {
    /// 400 Bad Request
    #[error("{0}")]
    BadRequest(String),
    /// 401 Unauthorized
    #[error("{0}")]
    Unauthorized(String),
    /// 404 Not Found
    #[error("{0}")]
    NotFound(String),
    /// 500 - the backend device could not be reached
    #[error(transparent)]
    Forward(#[from] ForwardError),
    /// 500 Internal Server Error
    #[error("{0}")]
    Internal(String),
}

/// Standard error response format
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: &'static str,
    message: String,
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forward(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::Forward(_) => "forward_failed",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.kind();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(error, %message, "API error");
        } else {
            tracing::debug!(error, %message, "API client error");
        }

        let body = Json(ErrorResponse {
            success: false,
            error,
            message,
        });

        (status, body).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidInput(msg) => ApiError::BadRequest(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_errors_are_bad_requests() {
        let err: ApiError = RegistryError::InvalidInput("clientId is required".to_string()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "clientId is required");
    }

    #[test]
    fn forward_errors_are_server_errors() {
        let err: ApiError = ForwardError::Timeout {
            address: "http://10.0.0.12:8080".to_string(),
            timeout_ms: 5000,
        }
        .into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("did not respond"));
    }

    #[tokio::test]
    async fn renders_json_body() {
        let response = ApiError::Unauthorized("missing api key".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "success": false,
                "error": "unauthorized",
                "message": "missing api key"
            })
        );
    }
}
