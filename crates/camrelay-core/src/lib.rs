//! camrelay-core - Core logic for the camera relay
//!
//! This crate holds everything the relay does that is independent of HTTP:
//!
//! - [`Registry`]: the shared map of client id to backend device
//! - [`Sweeper`]: the background task that evicts silent devices
//! - [`intent`]: pure translation of assistant intents into backend commands
//! - [`CommandRouter`]: resolves a client id and forwards a command through a
//!   [`CommandForwarder`]
//!
//! # Architecture
//!
//! ```text
//!   register / ping ──────────────┐
//!                                 ▼
//!   ┌──────────┐  resolve   ┌──────────┐  evict_stale  ┌─────────┐
//!   │ Router   │ ─────────► │ Registry │ ◄──────────── │ Sweeper │
//!   └────┬─────┘            └──────────┘               └─────────┘
//!        │ forward
//!        ▼
//!   CommandForwarder (HTTP, mock, ...)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use camrelay_core::{CommandRouter, Registry, Sweeper, SweeperConfig};
//!
//! let registry = Arc::new(Registry::new("http://localhost:8080"));
//! registry.register("kitchen", "http://10.0.0.12:8080", Some("Kitchen Pi"))?;
//!
//! let sweeper = Sweeper::spawn(registry.clone(), SweeperConfig::default());
//! let router = CommandRouter::new(registry, forwarder, Duration::from_secs(5));
//! let response = router.forward(Some("kitchen"), &payload).await?;
//! ```

pub mod error;
pub mod forward;
pub mod intent;
pub mod registry;
pub mod router;
pub mod sweeper;

pub use error::{ForwardError, RegistryError, RegistryResult};
pub use forward::{BackendResponse, CommandForwarder, COMMAND_PATH};
pub use intent::{CameraSlots, Command, Intent, Translation};
pub use registry::{BackendEntry, HeartbeatOutcome, Registry, DEFAULT_DISPLAY_NAME};
pub use router::CommandRouter;
pub use sweeper::{Sweeper, SweeperConfig};
