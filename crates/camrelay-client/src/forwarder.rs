//! reqwest-backed command forwarder

use std::time::Duration;

use async_trait::async_trait;
use camrelay_core::{BackendResponse, CommandForwarder, ForwardError, COMMAND_PATH};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Forwards command payloads to backend devices over HTTP.
///
/// Holds one connection pool shared by every request handler.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: Client,
}

impl HttpForwarder {
    /// Create a forwarder with default settings
    pub fn new() -> Result<Self, ForwardError> {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a forwarder with a custom connection timeout
    pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self, ForwardError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ForwardError::Request(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Build `{address}/api/alexa`, tolerating a trailing slash on the address
    pub fn command_url(address: &str) -> Result<Url, ForwardError> {
        let url = format!("{}{}", address.trim_end_matches('/'), COMMAND_PATH);
        let parsed = Url::parse(&url).map_err(|e| ForwardError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })?;

        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            other => Err(ForwardError::InvalidAddress {
                address: address.to_string(),
                reason: format!("unsupported scheme '{}'", other),
            }),
        }
    }
}

/// Classify a reqwest failure
fn classify(err: reqwest::Error, address: &str, timeout: Duration) -> ForwardError {
    if err.is_timeout() {
        ForwardError::Timeout {
            address: address.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    } else if err.is_connect() {
        ForwardError::Connect {
            address: address.to_string(),
            reason: err.to_string(),
        }
    } else {
        ForwardError::Request(err.to_string())
    }
}

#[async_trait]
impl CommandForwarder for HttpForwarder {
    #[instrument(skip(self, payload))]
    async fn send_command(
        &self,
        address: &str,
        payload: &serde_json::Value,
        timeout: Duration,
    ) -> Result<BackendResponse, ForwardError> {
        let url = Self::command_url(address)?;
        debug!(%url, "POST command");

        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| classify(e, address, timeout))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| classify(e, address, timeout))?;

        Ok(BackendResponse {
            status,
            content_type,
            body,
        })
    }
}
