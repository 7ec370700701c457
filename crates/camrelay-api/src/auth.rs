//! Shared-secret authentication middleware
//!
//! Protected routes require the configured secret in a request header
//! (`x-api-key` unless configured otherwise). The assistant endpoint and
//! `/health` are never protected. If no secret is configured, protected
//! routes pass through.

use axum::extract::{Request, State};
use axum::http::HeaderName;
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use crate::error::ApiError;
use crate::state::AppState;

/// Default header carrying the shared secret
pub const DEFAULT_API_KEY_HEADER: &str = "x-api-key";

/// Expected shared secret and the header it arrives in
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    header: HeaderName,
    key: String,
}

impl ApiKeyAuth {
    /// Expect `key` in the default header
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            header: HeaderName::from_static(DEFAULT_API_KEY_HEADER),
            key: key.into(),
        }
    }

    /// Expect `key` in `header`. Fails if `header` is not a valid header name.
    pub fn with_header(key: impl Into<String>, header: &str) -> Result<Self, String> {
        let header = HeaderName::try_from(header)
            .map_err(|e| format!("Invalid auth header name '{}': {}", header, e))?;
        Ok(Self {
            header,
            key: key.into(),
        })
    }

    /// Header name the secret is read from
    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// Check a provided value against the secret
    pub fn matches(&self, provided: &str) -> bool {
        self.key.as_bytes().ct_eq(provided.as_bytes()).into()
    }
}

/// Axum middleware function that checks the shared secret.
///
/// Returns 401 if the header is missing or wrong.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(auth) = state.auth() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(auth.header())
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(value) if auth.matches(value) => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "Invalid API key");
            Err(ApiError::Unauthorized("Invalid API key".to_string()))
        }
        None => {
            tracing::warn!(
                path = %request.uri().path(),
                header = %auth.header(),
                "Missing API key header"
            );
            Err(ApiError::Unauthorized(format!(
                "Missing {} header",
                auth.header()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_exact_key_only() {
        let auth = ApiKeyAuth::new("s3cret");
        assert!(auth.matches("s3cret"));
        assert!(!auth.matches("s3cre"));
        assert!(!auth.matches("s3creT"));
        assert!(!auth.matches(""));
        assert!(!auth.matches("s3cret-and-more"));
    }

    #[test]
    fn custom_header_is_normalized() {
        let auth = ApiKeyAuth::with_header("s3cret", "X-Relay-Key").unwrap();
        assert_eq!(auth.header().as_str(), "x-relay-key");
        assert!(ApiKeyAuth::with_header("s3cret", "bad header").is_err());
    }
}
