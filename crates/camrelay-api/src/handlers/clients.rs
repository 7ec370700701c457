//! Backend registration and heartbeat handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use camrelay_core::{BackendEntry, HeartbeatOutcome};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for `POST /api/register`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A register request that passed validation
#[derive(Debug)]
pub struct Registration {
    pub client_id: String,
    pub url: String,
    pub name: Option<String>,
}

impl RegisterRequest {
    /// Require `clientId` and `url`
    pub fn validate(self) -> Result<Registration, ApiError> {
        let client_id = required(self.client_id, "clientId")?;
        let url = required(self.url, "url")?;
        Ok(Registration {
            client_id,
            url,
            name: self.name,
        })
    }
}

/// Request body for `POST /api/ping`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingRequest {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{} is required", field)))
}

/// `{ "success": true }`
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

/// One registered backend
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub client_id: String,
    pub url: String,
    pub name: String,
    pub last_seen: String,
}

impl From<&BackendEntry> for ClientInfo {
    fn from(entry: &BackendEntry) -> Self {
        Self {
            client_id: entry.client_id.clone(),
            url: entry.address.clone(),
            name: entry.display_name.clone(),
            last_seen: entry.last_seen.to_rfc3339(),
        }
    }
}

/// Response for `GET /api/clients`
#[derive(Debug, Serialize)]
pub struct ClientListResponse {
    pub clients: Vec<ClientInfo>,
    pub count: usize,
}

/// POST /api/register
/// Register (or re-register) a backend device
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(request) = body?;
    let registration = request.validate()?;

    state.registry().register(
        &registration.client_id,
        &registration.url,
        registration.name.as_deref(),
    )?;

    Ok(SuccessResponse::ok())
}

/// POST /api/ping
/// Heartbeat from a backend device
pub async fn ping(
    State(state): State<AppState>,
    body: Result<Json<PingRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(request) = body?;
    let client_id = required(request.client_id, "clientId")?;

    let outcome = state.registry().heartbeat(
        &client_id,
        request.url.as_deref(),
        request.name.as_deref(),
    )?;

    if outcome == HeartbeatOutcome::Ignored {
        tracing::debug!(client_id = %client_id, "Ping from unregistered client without url");
    }

    Ok(SuccessResponse::ok())
}

/// GET /api/clients
/// List registered backend devices
pub async fn list_clients(State(state): State<AppState>) -> Json<ClientListResponse> {
    let clients: Vec<ClientInfo> = state
        .registry()
        .snapshot()
        .iter()
        .map(ClientInfo::from)
        .collect();

    Json(ClientListResponse {
        count: clients.len(),
        clients,
    })
}

/// DELETE /api/clients/{client_id}
/// Remove a backend device from the registry
pub async fn unregister(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if state.registry().unregister(&client_id) {
        Ok(SuccessResponse::ok())
    } else {
        Err(ApiError::NotFound(format!("Client not found: {}", client_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_requires_client_id_and_url() {
        let missing_url = RegisterRequest {
            client_id: Some("kitchen".to_string()),
            url: None,
            name: None,
        };
        match missing_url.validate() {
            Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "url is required"),
            other => panic!("unexpected: {:?}", other),
        }

        let blank_id = RegisterRequest {
            client_id: Some("  ".to_string()),
            url: Some("http://10.0.0.12:8080".to_string()),
            name: None,
        };
        assert!(matches!(blank_id.validate(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn validate_passes_name_through() {
        let request = RegisterRequest {
            client_id: Some("kitchen".to_string()),
            url: Some("http://10.0.0.12:8080".to_string()),
            name: Some("Kitchen Pi".to_string()),
        };
        let registration = request.validate().unwrap();
        assert_eq!(registration.client_id, "kitchen");
        assert_eq!(registration.name.as_deref(), Some("Kitchen Pi"));
    }
}
