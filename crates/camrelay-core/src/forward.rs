//! Forwarding seam between the router and the transport
//!
//! The router only knows how to pick an address. Delivering the payload is
//! delegated to a [`CommandForwarder`] so the HTTP client can be swapped for
//! a mock in tests.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::ForwardError;

/// Path on the backend device that accepts command payloads
pub const COMMAND_PATH: &str = "/api/alexa";

/// Response returned by a backend device, relayed as-is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendResponse {
    /// HTTP status code
    pub status: u16,
    /// Value of the `Content-Type` header, if any
    pub content_type: Option<String>,
    /// Raw response body
    pub body: Bytes,
}

impl BackendResponse {
    /// Build a JSON response (mostly useful for mocks)
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: Bytes::from(value.to_string()),
        }
    }

    /// Whether the backend answered with a 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Delivers a command payload to a backend device.
///
/// Implementations make exactly one attempt and must give up after
/// `timeout`, reporting [`ForwardError::Timeout`].
#[async_trait]
pub trait CommandForwarder: Send + Sync {
    /// POST `payload` to `{address}{COMMAND_PATH}`
    async fn send_command(
        &self,
        address: &str,
        payload: &serde_json::Value,
        timeout: Duration,
    ) -> Result<BackendResponse, ForwardError>;
}
