//! Health check handler

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub connected_clients: usize,
    pub default_backend: String,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry = state.registry();
    Json(HealthResponse {
        status: "ok",
        connected_clients: registry.count(),
        default_backend: registry.default_address().to_string(),
    })
}
