//! Voice-assistant request and response envelopes
//!
//! The inbound envelope is parsed into an [`AssistantRequest`] at the
//! boundary so handlers never deal with half-filled JSON. Anything the
//! relay cannot act on becomes a [`ProtocolError`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Envelope version written on every response
pub const RESPONSE_VERSION: &str = "1.0";

/// Request types that carry no intent
pub const LAUNCH_REQUEST: &str = "LaunchRequest";
pub const SESSION_ENDED_REQUEST: &str = "SessionEndedRequest";
pub const INTENT_REQUEST: &str = "IntentRequest";

// =========================================================================
// Inbound envelope (raw wire shape)
// =========================================================================

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    request: Option<RawRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRequest {
    #[serde(rename = "type", default)]
    request_type: Option<String>,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    intent: Option<RawIntent>,
}

#[derive(Debug, Deserialize)]
struct RawIntent {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    slots: Option<HashMap<String, RawSlot>>,
}

#[derive(Debug, Deserialize)]
struct RawSlot {
    #[serde(default)]
    value: Option<serde_json::Value>,
}

// =========================================================================
// Parsed request
// =========================================================================

/// Why an envelope was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Malformed request envelope: {0}")]
    Malformed(String),
    #[error("Missing request type")]
    MissingRequestType,
    #[error("Missing intent name")]
    MissingIntentName,
}

/// A validated assistant request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantRequest {
    /// The skill was opened without an intent
    Launch,
    /// The assistant closed the session
    SessionEnded,
    /// A named intent with its populated slots
    Intent {
        name: String,
        slots: HashMap<String, String>,
    },
    /// A request type the relay does not act on
    Other(String),
}

impl AssistantRequest {
    /// Parse and validate a raw request body
    pub fn parse(body: &[u8]) -> Result<(Self, Option<String>), ProtocolError> {
        let envelope: RawEnvelope =
            serde_json::from_slice(body).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

        let request = envelope.request.ok_or(ProtocolError::MissingRequestType)?;
        let request_type = request
            .request_type
            .filter(|t| !t.is_empty())
            .ok_or(ProtocolError::MissingRequestType)?;

        let parsed = match request_type.as_str() {
            LAUNCH_REQUEST => AssistantRequest::Launch,
            SESSION_ENDED_REQUEST => AssistantRequest::SessionEnded,
            INTENT_REQUEST => {
                let intent = request.intent.ok_or(ProtocolError::MissingIntentName)?;
                let name = intent
                    .name
                    .filter(|n| !n.is_empty())
                    .ok_or(ProtocolError::MissingIntentName)?;
                let slots = intent
                    .slots
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|(slot, raw)| slot_value(raw.value).map(|v| (slot, v)))
                    .collect();
                AssistantRequest::Intent { name, slots }
            }
            _ => AssistantRequest::Other(request_type),
        };

        Ok((parsed, request.request_id))
    }
}

/// Only populated scalar slot values count
fn slot_value(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// =========================================================================
// Outbound envelope
// =========================================================================

/// Plain-text speech
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpeech {
    #[serde(rename = "type")]
    pub speech_type: String,
    pub text: String,
}

/// Body of an assistant response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_speech: Option<OutputSpeech>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_end_session: Option<bool>,
}

/// Assistant response envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantResponse {
    pub version: String,
    pub response: ResponseBody,
}

impl AssistantResponse {
    /// Speak `text` (omitted when empty) and set the session flag
    pub fn speak(text: impl Into<String>, end_session: bool) -> Self {
        let text = text.into();
        let output_speech = (!text.is_empty()).then(|| OutputSpeech {
            speech_type: "PlainText".to_string(),
            text,
        });

        Self {
            version: RESPONSE_VERSION.to_string(),
            response: ResponseBody {
                output_speech,
                should_end_session: Some(end_session),
            },
        }
    }

    /// Empty acknowledgement
    pub fn empty() -> Self {
        Self {
            version: RESPONSE_VERSION.to_string(),
            response: ResponseBody::default(),
        }
    }

    /// Spoken text, if any
    pub fn speech(&self) -> Option<&str> {
        self.response
            .output_speech
            .as_ref()
            .map(|s| s.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<AssistantRequest, ProtocolError> {
        AssistantRequest::parse(value.to_string().as_bytes()).map(|(r, _)| r)
    }

    #[test]
    fn parses_intent_with_slots() {
        let request = parse(json!({
            "version": "1.0",
            "session": { "new": false },
            "request": {
                "type": "IntentRequest",
                "requestId": "req-1",
                "intent": {
                    "name": "OpenCameraIntent",
                    "slots": {
                        "cameraNumber": { "name": "cameraNumber", "value": "3" },
                        "firstCamera": { "name": "firstCamera" },
                        "secondCamera": { "name": "secondCamera", "value": 2 }
                    }
                }
            }
        }))
        .unwrap();

        let mut expected = HashMap::new();
        expected.insert("cameraNumber".to_string(), "3".to_string());
        expected.insert("secondCamera".to_string(), "2".to_string());
        assert_eq!(
            request,
            AssistantRequest::Intent {
                name: "OpenCameraIntent".to_string(),
                slots: expected,
            }
        );
    }

    #[test]
    fn returns_request_id() {
        let body = json!({
            "request": { "type": "LaunchRequest", "requestId": "req-42" }
        });
        let (request, id) = AssistantRequest::parse(body.to_string().as_bytes()).unwrap();
        assert_eq!(request, AssistantRequest::Launch);
        assert_eq!(id.as_deref(), Some("req-42"));
    }

    #[test]
    fn recognizes_session_types() {
        assert_eq!(
            parse(json!({ "request": { "type": "SessionEndedRequest" } })).unwrap(),
            AssistantRequest::SessionEnded
        );
        assert_eq!(
            parse(json!({ "request": { "type": "CanFulfillIntentRequest" } })).unwrap(),
            AssistantRequest::Other("CanFulfillIntentRequest".to_string())
        );
    }

    #[test]
    fn rejects_malformed_envelopes() {
        assert!(matches!(
            AssistantRequest::parse(b"not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert_eq!(parse(json!({})), Err(ProtocolError::MissingRequestType));
        assert_eq!(
            parse(json!({ "request": {} })),
            Err(ProtocolError::MissingRequestType)
        );
        assert_eq!(
            parse(json!({ "request": { "type": "IntentRequest" } })),
            Err(ProtocolError::MissingIntentName)
        );
        assert_eq!(
            parse(json!({ "request": { "type": "IntentRequest", "intent": { "name": "" } } })),
            Err(ProtocolError::MissingIntentName)
        );
    }

    #[test]
    fn speak_serializes_camel_case() {
        let response = AssistantResponse::speak("Displaying camera 3.", false);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "version": "1.0",
                "response": {
                    "outputSpeech": { "type": "PlainText", "text": "Displaying camera 3." },
                    "shouldEndSession": false
                }
            })
        );
    }

    #[test]
    fn empty_speech_is_omitted() {
        let response = AssistantResponse::speak("", false);
        assert_eq!(response.speech(), None);
        assert_eq!(
            serde_json::to_value(&AssistantResponse::empty()).unwrap(),
            json!({ "version": "1.0", "response": {} })
        );
    }
}
