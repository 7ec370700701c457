//! Voice-assistant endpoint
//!
//! Every outcome, including backend failures, is answered with a well-formed
//! assistant envelope. Only a malformed inbound envelope or query string
//! changes the status code (400).

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use camrelay_core::intent::{self, APOLOGY_SPEECH, FALLBACK_SPEECH, WELCOME_SPEECH};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::protocol::{AssistantRequest, AssistantResponse};
use crate::state::AppState;

/// Query parameters accepted by `POST /alexa`
#[derive(Debug, Default, Deserialize)]
pub struct AssistantQuery {
    #[serde(rename = "clientId", default)]
    pub client_id: Option<String>,
}

/// POST /alexa
/// Handle one assistant request envelope
pub async fn handle_assistant(
    State(state): State<AppState>,
    query: Result<Query<AssistantQuery>, QueryRejection>,
    body: Bytes,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(e) => {
            warn!(error = %e, "Rejected assistant query string");
            return fallback();
        }
    };

    let (request, request_id) = match AssistantRequest::parse(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "Rejected assistant request");
            return fallback();
        }
    };

    debug!(request_id = ?request_id, request = ?request, "Assistant request");

    let client_id = query
        .client_id
        .filter(|id| !id.trim().is_empty())
        .or_else(|| state.assistant_client_id().map(str::to_string));

    let response = respond(&state, client_id.as_deref(), request).await;
    Json(response).into_response()
}

/// 400 with the fallback speech envelope
fn fallback() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(AssistantResponse::speak(FALLBACK_SPEECH, false)),
    )
        .into_response()
}

async fn respond(
    state: &AppState,
    client_id: Option<&str>,
    request: AssistantRequest,
) -> AssistantResponse {
    let (name, slots) = match request {
        AssistantRequest::Launch => return AssistantResponse::speak(WELCOME_SPEECH, false),
        AssistantRequest::SessionEnded => return AssistantResponse::empty(),
        AssistantRequest::Other(request_type) => {
            debug!(request_type = %request_type, "Ignoring assistant request type");
            return AssistantResponse::empty();
        }
        AssistantRequest::Intent { name, slots } => (name, slots),
    };

    let translation = intent::translate(&name, &slots);
    if !translation.forwardable {
        return AssistantResponse::speak(translation.speech, translation.end_session);
    }

    let payload = match serde_json::to_value(&translation.command) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Failed to encode command");
            return AssistantResponse::speak(APOLOGY_SPEECH, false);
        }
    };

    match state.router().forward(client_id, &payload).await {
        Ok(response) if response.is_success() => {
            info!(intent = %name, client_id = ?client_id, "Camera command sent");
            AssistantResponse::speak(translation.speech, translation.end_session)
        }
        Ok(response) => {
            warn!(
                intent = %name,
                client_id = ?client_id,
                status = response.status,
                "Backend rejected camera command"
            );
            AssistantResponse::speak(APOLOGY_SPEECH, false)
        }
        Err(_) => AssistantResponse::speak(APOLOGY_SPEECH, false),
    }
}
