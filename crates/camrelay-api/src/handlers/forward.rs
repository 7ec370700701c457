//! Generic command forwarding handler
//!
//! The payload is passed to the backend untouched and the backend's status
//! and body are relayed back verbatim.

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use camrelay_core::BackendResponse;

use crate::error::ApiError;
use crate::state::AppState;

/// Header naming the target backend
pub const CLIENT_ID_HEADER: &str = "clientid";

/// Read the optional `clientId` header
fn client_id_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Turn a backend answer into the response sent to our caller
fn relay(response: BackendResponse) -> Result<Response, ApiError> {
    let status = StatusCode::from_u16(response.status).map_err(|e| {
        ApiError::Internal(format!(
            "Backend returned invalid status {}: {}",
            response.status, e
        ))
    })?;

    let mut builder = Response::builder().status(status);
    if let Some(content_type) = &response.content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type.as_str());
    }

    builder
        .body(Body::from(response.body))
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {}", e)))
}

/// POST /api/alexa
/// Forward an arbitrary command payload to the resolved backend
pub async fn forward_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = body?;
    if payload.is_null() {
        return Err(ApiError::BadRequest("Command payload is required".to_string()));
    }

    let client_id = client_id_from(&headers);
    let response = state
        .router()
        .forward(client_id.as_deref(), &payload)
        .await?;

    relay(response)
}
