//! Registry of reachable backend devices
//!
//! Backend devices announce themselves with `register` and keep their entry
//! alive with `heartbeat`. Request handlers resolve a client id to the
//! device's base URL, and the [`crate::Sweeper`] evicts devices that have
//! gone silent.
//!
//! A single coarse lock guards the whole map. Every operation takes the
//! lock for the duration of one in-memory read or write and never across an
//! `.await`, so the outbound forward call is never serialized behind it.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{RegistryError, RegistryResult};

/// Display name stored when a device registers without one
pub const DEFAULT_DISPLAY_NAME: &str = "Unknown device";

/// One registered backend device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendEntry {
    /// Caller-assigned key, never empty
    pub client_id: String,
    /// Base URL of the device, never empty
    pub address: String,
    /// Human-readable device name
    pub display_name: String,
    /// Last register, heartbeat or successful forward
    pub last_seen: DateTime<Utc>,
}

/// What a heartbeat did to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// The id was unknown and an address was supplied, so a new entry was created
    Registered,
    /// The id was known and its entry was refreshed
    Refreshed,
    /// The id was unknown and no address was supplied; nothing was stored
    Ignored,
}

/// Concurrent-safe map of client id to backend device
#[derive(Debug)]
pub struct Registry {
    entries: RwLock<HashMap<String, BackendEntry>>,
    /// Address returned by `resolve` when the id is unknown
    default_address: String,
    /// Name used when a device registers without one
    default_display_name: String,
}

/// Treat empty strings the same as an absent field.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl Registry {
    /// Create an empty registry that falls back to `default_address`
    pub fn new(default_address: impl Into<String>) -> Self {
        Self::with_display_name(default_address, DEFAULT_DISPLAY_NAME)
    }

    /// Create an empty registry with a custom placeholder display name
    pub fn with_display_name(
        default_address: impl Into<String>,
        default_display_name: impl Into<String>,
    ) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_address: default_address.into(),
            default_display_name: default_display_name.into(),
        }
    }

    /// Insert or fully overwrite the entry for `client_id`.
    ///
    /// Fails with [`RegistryError::InvalidInput`] when `client_id` or
    /// `address` is empty.
    pub fn register(
        &self,
        client_id: &str,
        address: &str,
        display_name: Option<&str>,
    ) -> RegistryResult<()> {
        let client_id = non_empty(Some(client_id))
            .ok_or_else(|| RegistryError::InvalidInput("clientId is required".to_string()))?;
        let address = non_empty(Some(address))
            .ok_or_else(|| RegistryError::InvalidInput("url is required".to_string()))?;

        let entry = BackendEntry {
            client_id: client_id.to_string(),
            address: address.to_string(),
            display_name: non_empty(display_name)
                .unwrap_or(&self.default_display_name)
                .to_string(),
            last_seen: Utc::now(),
        };

        info!(
            client_id = %entry.client_id,
            address = %entry.address,
            name = %entry.display_name,
            "Backend registered"
        );
        self.entries.write().insert(entry.client_id.clone(), entry);
        Ok(())
    }

    /// Refresh the entry for `client_id`.
    ///
    /// Known ids get a new `last_seen` and have `address` / `display_name`
    /// overwritten only when supplied. Unknown ids are registered when an
    /// address is supplied and ignored otherwise.
    pub fn heartbeat(
        &self,
        client_id: &str,
        address: Option<&str>,
        display_name: Option<&str>,
    ) -> RegistryResult<HeartbeatOutcome> {
        let client_id = non_empty(Some(client_id))
            .ok_or_else(|| RegistryError::InvalidInput("clientId is required".to_string()))?;
        let address = non_empty(address);
        let display_name = non_empty(display_name);

        let mut entries = self.entries.write();
        if let Some(entry) = entries.get_mut(client_id) {
            entry.last_seen = Utc::now();
            if let Some(address) = address {
                entry.address = address.to_string();
            }
            if let Some(name) = display_name {
                entry.display_name = name.to_string();
            }
            debug!(client_id = %client_id, address = %entry.address, "Heartbeat");
            return Ok(HeartbeatOutcome::Refreshed);
        }

        let Some(address) = address else {
            debug!(client_id = %client_id, "Heartbeat from unknown client without url, ignoring");
            return Ok(HeartbeatOutcome::Ignored);
        };

        let entry = BackendEntry {
            client_id: client_id.to_string(),
            address: address.to_string(),
            display_name: display_name
                .unwrap_or(&self.default_display_name)
                .to_string(),
            last_seen: Utc::now(),
        };
        info!(
            client_id = %entry.client_id,
            address = %entry.address,
            "Backend registered via heartbeat"
        );
        entries.insert(entry.client_id.clone(), entry);
        Ok(HeartbeatOutcome::Registered)
    }

    /// Refresh `last_seen` of a known entry. Returns false for unknown ids.
    pub fn touch(&self, client_id: &str) -> bool {
        match self.entries.write().get_mut(client_id) {
            Some(entry) => {
                entry.last_seen = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Resolve a client id to a backend address.
    ///
    /// Never fails: unknown, empty or absent ids yield the default address.
    pub fn resolve(&self, client_id: Option<&str>) -> String {
        non_empty(client_id)
            .and_then(|id| self.entries.read().get(id).map(|e| e.address.clone()))
            .unwrap_or_else(|| self.default_address.clone())
    }

    /// Look up a single entry
    pub fn get(&self, client_id: &str) -> Option<BackendEntry> {
        self.entries.read().get(client_id).cloned()
    }

    /// Remove an entry. Returns true when something was removed.
    pub fn unregister(&self, client_id: &str) -> bool {
        let removed = self.entries.write().remove(client_id).is_some();
        if removed {
            info!(client_id = %client_id, "Backend unregistered");
        }
        removed
    }

    /// Number of currently tracked entries
    pub fn count(&self) -> usize {
        self.entries.read().len()
    }

    /// Consistent copy of all entries, sorted by client id
    pub fn snapshot(&self) -> Vec<BackendEntry> {
        let mut entries: Vec<BackendEntry> = self.entries.read().values().cloned().collect();
        entries.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        entries
    }

    /// Address used when a client id cannot be resolved
    pub fn default_address(&self) -> &str {
        &self.default_address
    }

    /// Remove every entry with `now - last_seen > threshold`.
    ///
    /// Returns the evicted client ids.
    pub fn evict_stale(&self, now: DateTime<Utc>, threshold: Duration) -> Vec<String> {
        let mut evicted = Vec::new();
        self.entries.write().retain(|client_id, entry| {
            let keep = now.signed_duration_since(entry.last_seen) <= threshold;
            if !keep {
                evicted.push(client_id.clone());
            }
            keep
        });
        evicted.sort();
        evicted
    }
}
