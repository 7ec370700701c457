//! Application state for the relay API

use std::sync::Arc;

use camrelay_core::{CommandRouter, Registry};

use crate::auth::ApiKeyAuth;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolves client ids and forwards commands
    router: CommandRouter,
    /// Shared secret for protected routes; `None` leaves them open
    auth: Option<Arc<ApiKeyAuth>>,
    /// Client id used by the assistant endpoint when the request names none
    assistant_client_id: Option<String>,
}

impl AppState {
    /// Create a new AppState around a command router
    pub fn new(router: CommandRouter) -> Self {
        Self {
            router,
            auth: None,
            assistant_client_id: None,
        }
    }

    /// Require `auth` on protected routes
    pub fn with_auth(mut self, auth: ApiKeyAuth) -> Self {
        self.auth = Some(Arc::new(auth));
        self
    }

    /// Route assistant requests to `client_id` by default
    pub fn with_assistant_client_id(mut self, client_id: Option<String>) -> Self {
        self.assistant_client_id = client_id.filter(|id| !id.trim().is_empty());
        self
    }

    /// Get the command router
    pub fn router(&self) -> &CommandRouter {
        &self.router
    }

    /// Get the registry
    pub fn registry(&self) -> &Arc<Registry> {
        self.router.registry()
    }

    /// Get the shared-secret configuration
    pub fn auth(&self) -> Option<&ApiKeyAuth> {
        self.auth.as_deref()
    }

    /// Get the default assistant client id
    pub fn assistant_client_id(&self) -> Option<&str> {
        self.assistant_client_id.as_deref()
    }
}
