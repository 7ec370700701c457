//! Relay HTTP client implementation

use std::time::Duration;

use bytes::Bytes;
use camrelay_core::BackendResponse;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{RelayClientError, Result};
use crate::types::*;

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Header carrying the shared secret unless configured otherwise
pub const DEFAULT_API_KEY_HEADER: &str = "x-api-key";
/// Header selecting the target backend on `POST /api/alexa`
pub const CLIENT_ID_HEADER: &str = "clientId";

/// Client for a relay server.
///
/// Backend devices use it to announce themselves and keep their registry
/// entry alive; tools use it to forward commands.
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    api_key_header: String,
}

impl RelayClient {
    /// Create a new client for the relay at `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new client with custom timeouts
    pub fn with_config(base_url: &str, timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        let base_url = Url::parse(base_url)?;

        Ok(Self {
            client,
            base_url,
            api_key: None,
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
        })
    }

    /// Send `key` as the shared secret on protected routes
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Use a different header name for the shared secret
    pub fn with_api_key_header(mut self, header: impl Into<String>) -> Self {
        self.api_key_header = header.into();
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(self.api_key_header.as_str(), key.as_str()),
            None => request,
        }
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Check server health
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = self.base_url.join("/health")?;
        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    // =========================================================================
    // Registry
    // =========================================================================

    /// Register this device
    #[instrument(skip(self))]
    pub async fn register(&self, client_id: &str, url: &str, name: Option<&str>) -> Result<()> {
        let endpoint = self.base_url.join("/api/register")?;
        let body = RegisterBody {
            client_id,
            url,
            name,
        };

        let response = self
            .authorized(self.client.post(endpoint))
            .json(&body)
            .send()
            .await?;
        self.handle_response::<Ack>(response).await.map(|_| ())
    }

    /// Send a heartbeat, optionally updating the url and name
    #[instrument(skip(self))]
    pub async fn ping(
        &self,
        client_id: &str,
        url: Option<&str>,
        name: Option<&str>,
    ) -> Result<()> {
        let endpoint = self.base_url.join("/api/ping")?;
        let body = PingBody {
            client_id,
            url,
            name,
        };

        let response = self
            .authorized(self.client.post(endpoint))
            .json(&body)
            .send()
            .await?;
        self.handle_response::<Ack>(response).await.map(|_| ())
    }

    /// List registered backends
    #[instrument(skip(self))]
    pub async fn list_clients(&self) -> Result<ClientList> {
        let url = self.base_url.join("/api/clients")?;
        let response = self.authorized(self.client.get(url)).send().await?;
        self.handle_response(response).await
    }

    /// Remove a backend from the registry
    #[instrument(skip(self))]
    pub async fn unregister(&self, client_id: &str) -> Result<()> {
        let mut url = self.base_url.join("/api/clients/")?;
        url.path_segments_mut()
            .map_err(|_| RelayClientError::ParseError("base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(client_id);

        let response = self.authorized(self.client.delete(url)).send().await?;
        self.handle_response::<Ack>(response).await.map(|_| ())
    }

    // =========================================================================
    // Forwarding
    // =========================================================================

    /// Forward an arbitrary payload through the relay.
    ///
    /// The backend's status and body are returned as relayed, including
    /// non-2xx answers from the backend itself.
    #[instrument(skip(self, payload))]
    pub async fn forward(
        &self,
        client_id: Option<&str>,
        payload: &serde_json::Value,
    ) -> Result<BackendResponse> {
        let url = self.base_url.join("/api/alexa")?;
        let mut request = self.authorized(self.client.post(url)).json(payload);
        if let Some(id) = client_id {
            request = request.header(CLIENT_ID_HEADER, id);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(RelayClientError::Unauthorized);
        }

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body: Bytes = response.bytes().await?;
        debug!(status, len = body.len(), "Forward response");

        Ok(BackendResponse {
            status,
            content_type,
            body,
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            let text = response.text().await?;
            serde_json::from_str(&text).map_err(|e| RelayClientError::ParseError(e.to_string()))
        } else {
            Err(self.extract_error(response).await)
        }
    }

    async fn extract_error(&self, response: Response) -> RelayClientError {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return RelayClientError::Unauthorized;
        }

        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) if !body.message.is_empty() => body.message,
            Ok(body) if !body.error.is_empty() => body.error,
            _ => text,
        };
        RelayClientError::server_error(status.as_u16(), message)
    }
}
