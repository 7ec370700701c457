//! Common error types for the relay core

use thiserror::Error;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors returned by [`crate::Registry`] mutations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A required field was missing or empty
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Errors that can occur while forwarding a command to a backend device
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The backend did not answer within the forward timeout
    #[error("Backend at {address} did not respond within {timeout_ms}ms")]
    Timeout { address: String, timeout_ms: u64 },

    /// The backend could not be reached at all
    #[error("Failed to connect to backend at {address}: {reason}")]
    Connect { address: String, reason: String },

    /// The resolved backend address is not a usable base URL
    #[error("Invalid backend address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Any other transport failure (body read, protocol error)
    #[error("Forward request failed: {0}")]
    Request(String),
}

impl ForwardError {
    /// Returns true when the failure was caused by the bounded timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, ForwardError::Timeout { .. })
    }
}
