//! Request routing to backend devices

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ForwardError;
use crate::forward::{BackendResponse, CommandForwarder};
use crate::registry::Registry;

/// Resolves client ids through the [`Registry`] and forwards payloads.
///
/// The registry lock is only held while resolving; the outbound call runs
/// without it.
#[derive(Clone)]
pub struct CommandRouter {
    registry: Arc<Registry>,
    forwarder: Arc<dyn CommandForwarder>,
    timeout: Duration,
}

impl CommandRouter {
    pub fn new(
        registry: Arc<Registry>,
        forwarder: Arc<dyn CommandForwarder>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            forwarder,
            timeout,
        }
    }

    /// The registry this router resolves against
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Forward timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Forward `payload` to the backend registered under `client_id`, or to
    /// the default address when the id is absent or unknown.
    ///
    /// A single attempt is made. A 2xx answer refreshes the entry's
    /// `last_seen`; non-2xx answers and errors leave the registry untouched.
    pub async fn forward(
        &self,
        client_id: Option<&str>,
        payload: &serde_json::Value,
    ) -> Result<BackendResponse, ForwardError> {
        let address = self.registry.resolve(client_id);
        debug!(client_id = ?client_id, address = %address, "Forwarding command");

        match self
            .forwarder
            .send_command(&address, payload, self.timeout)
            .await
        {
            Ok(response) => {
                if response.is_success() {
                    if let Some(id) = client_id {
                        self.registry.touch(id);
                    }
                }
                debug!(address = %address, status = response.status, "Backend responded");
                Ok(response)
            }
            Err(e) => {
                warn!(client_id = ?client_id, address = %address, error = %e, "Forward failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Records every call and answers with a canned result
    struct MockForwarder {
        calls: Mutex<Vec<String>>,
        fail: bool,
        status: u16,
    }

    impl MockForwarder {
        fn new(fail: bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail,
                status: 200,
            }
        }

        fn with_status(status: u16) -> Self {
            Self {
                status,
                ..Self::new(false)
            }
        }
    }

    #[async_trait]
    impl CommandForwarder for MockForwarder {
        async fn send_command(
            &self,
            address: &str,
            _payload: &serde_json::Value,
            timeout: Duration,
        ) -> Result<BackendResponse, ForwardError> {
            self.calls.lock().push(address.to_string());
            if self.fail {
                Err(ForwardError::Timeout {
                    address: address.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            } else {
                Ok(BackendResponse::json(self.status, &json!({ "ok": true })))
            }
        }
    }

    fn router(fail: bool) -> (CommandRouter, Arc<MockForwarder>) {
        let registry = Arc::new(Registry::new("http://default:8080"));
        let forwarder = Arc::new(MockForwarder::new(fail));
        let router = CommandRouter::new(registry, forwarder.clone(), Duration::from_secs(5));
        (router, forwarder)
    }

    #[tokio::test]
    async fn forwards_to_registered_address() {
        let (router, forwarder) = router(false);
        router
            .registry()
            .register("kitchen", "http://10.0.0.12:8080", None)
            .unwrap();

        let response = router
            .forward(Some("kitchen"), &json!({ "intent": "x" }))
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(*forwarder.calls.lock(), vec!["http://10.0.0.12:8080"]);
    }

    #[tokio::test]
    async fn unknown_client_uses_default_address() {
        let (router, forwarder) = router(false);
        router.forward(Some("nobody"), &json!({})).await.unwrap();
        router.forward(None, &json!({})).await.unwrap();

        assert_eq!(
            *forwarder.calls.lock(),
            vec!["http://default:8080", "http://default:8080"]
        );
    }

    #[tokio::test]
    async fn success_refreshes_last_seen() {
        let (router, _) = router(false);
        let registry = router.registry().clone();
        registry
            .register("kitchen", "http://10.0.0.12:8080", None)
            .unwrap();
        let registered = registry.get("kitchen").unwrap().last_seen;
        tokio::time::sleep(Duration::from_millis(5)).await;

        router.forward(Some("kitchen"), &json!({})).await.unwrap();
        assert!(registry.get("kitchen").unwrap().last_seen > registered);
        assert!(registry.get("kitchen").unwrap().last_seen <= Utc::now());
    }

    #[tokio::test]
    async fn failure_is_reported_once_and_keeps_entry() {
        let (router, forwarder) = router(true);
        router
            .registry()
            .register("kitchen", "http://10.0.0.12:8080", None)
            .unwrap();

        let err = router
            .forward(Some("kitchen"), &json!({}))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(forwarder.calls.lock().len(), 1);
        assert_eq!(router.registry().count(), 1);
    }

    #[tokio::test]
    async fn non_success_status_keeps_last_seen() {
        let registry = Arc::new(Registry::new("http://default:8080"));
        let router = CommandRouter::new(
            registry.clone(),
            Arc::new(MockForwarder::with_status(503)),
            Duration::from_secs(5),
        );
        registry
            .register("kitchen", "http://10.0.0.12:8080", None)
            .unwrap();
        let registered = registry.get("kitchen").unwrap().last_seen;
        tokio::time::sleep(Duration::from_millis(5)).await;

        let response = router.forward(Some("kitchen"), &json!({})).await.unwrap();

        assert_eq!(response.status, 503);
        assert_eq!(registry.get("kitchen").unwrap().last_seen, registered);
    }
}
