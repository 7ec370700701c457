//! camrelay-api - HTTP layer of the camera relay
//!
//! Exposes the registry and command router over axum:
//!
//! | Route                          | Auth   | Purpose                          |
//! |--------------------------------|--------|----------------------------------|
//! | `GET /health`                  | open   | liveness and client count        |
//! | `POST /alexa`                  | open   | voice-assistant envelope         |
//! | `POST /api/register`           | secret | register a backend device        |
//! | `POST /api/ping`               | secret | heartbeat                        |
//! | `POST /api/alexa`              | secret | forward a raw command            |
//! | `GET /api/clients`             | secret | list registered devices          |
//! | `DELETE /api/clients/{id}`     | secret | remove a device                  |
//!
//! # Usage
//!
//! ```ignore
//! use camrelay_api::{create_router, ApiKeyAuth, AppState};
//!
//! let state = AppState::new(router).with_auth(ApiKeyAuth::new("s3cret"));
//! let app = create_router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod error;
pub mod handlers;
pub mod protocol;
pub mod state;

pub use auth::{ApiKeyAuth, DEFAULT_API_KEY_HEADER};
pub use error::ApiError;
pub use protocol::{AssistantRequest, AssistantResponse, ProtocolError};
pub use state::AppState;

use std::any::Any;

use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as CorsAny, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the relay router with the given application state
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(CorsAny)
        .allow_methods(CorsAny)
        .allow_headers(CorsAny);

    let protected = Router::new()
        .route("/api/register", post(handlers::clients::register))
        .route("/api/ping", post(handlers::clients::ping))
        .route("/api/alexa", post(handlers::forward::forward_command))
        .route("/api/clients", get(handlers::clients::list_clients))
        .route(
            "/api/clients/{client_id}",
            delete(handlers::clients::unregister),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/alexa", post(handlers::assistant::handle_assistant))
        .merge(protected)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Turn a handler panic into a JSON 500
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    ApiError::Internal(format!("Handler panicked: {}", detail)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use camrelay_core::{BackendResponse, CommandForwarder, CommandRouter, ForwardError, Registry};
    use serde_json::Value;
    use tower::ServiceExt;

    /// Answers every command with 200, or panics when asked to
    struct StubForwarder {
        panic: bool,
    }

    #[async_trait]
    impl CommandForwarder for StubForwarder {
        async fn send_command(
            &self,
            _address: &str,
            _payload: &Value,
            _timeout: Duration,
        ) -> Result<BackendResponse, ForwardError> {
            if self.panic {
                panic!("forwarder exploded");
            }
            Ok(BackendResponse::json(200, &serde_json::json!({ "ok": true })))
        }
    }

    fn app(panic: bool, key: Option<&str>) -> Router {
        let registry = Arc::new(Registry::new("http://127.0.0.1:8080"));
        let router = CommandRouter::new(
            registry,
            Arc::new(StubForwarder { panic }),
            Duration::from_secs(1),
        );
        let mut state = AppState::new(router);
        if let Some(key) = key {
            state = state.with_auth(ApiKeyAuth::new(key));
        }
        create_router(state)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_key() {
        let response = app(false, Some("k"))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["connectedClients"], 0);
        assert_eq!(body["defaultBackend"], "http://127.0.0.1:8080");
    }

    #[tokio::test]
    async fn api_routes_need_key_when_configured() {
        let response = app(false, Some("k"))
            .oneshot(post_json("/api/alexa", r#"{"intent":"x"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "unauthorized");

        let mut request = post_json("/api/alexa", r#"{"intent":"x"}"#);
        request
            .headers_mut()
            .insert("x-api-key", "k".parse().unwrap());
        let response = app(false, Some("k")).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn api_routes_open_without_key() {
        let response = app(false, None)
            .oneshot(post_json(
                "/api/register",
                r#"{"clientId":"kitchen","url":"http://10.0.0.12:8080"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["success"], true);
    }

    #[tokio::test]
    async fn null_forward_payload_is_rejected() {
        let response = app(false, None)
            .oneshot(post_json("/api/alexa", "null"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn assistant_endpoint_ignores_key() {
        let response = app(false, Some("k"))
            .oneshot(post_json(
                "/alexa",
                r#"{"version":"1.0","request":{"type":"LaunchRequest"}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bad_assistant_query_gets_fallback_speech() {
        let response = app(false, None)
            .oneshot(post_json(
                "/alexa?clientId=a&clientId=b",
                r#"{"version":"1.0","request":{"type":"LaunchRequest"}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(
            body["response"]["outputSpeech"]["text"],
            camrelay_core::intent::FALLBACK_SPEECH
        );
        assert_eq!(body["response"]["shouldEndSession"], false);
    }

    #[tokio::test]
    async fn handler_panic_becomes_json_500() {
        let response = app(true, None)
            .oneshot(post_json("/api/alexa", r#"{"intent":"x"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "internal_error");
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("forwarder exploded"));
    }

    #[tokio::test]
    async fn unknown_client_delete_is_404() {
        let request = Request::delete("/api/clients/nobody")
            .body(Body::empty())
            .unwrap();
        let response = app(false, None).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
