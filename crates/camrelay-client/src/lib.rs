//! camrelay-client - HTTP side of the camera relay
//!
//! - [`HttpForwarder`] delivers command payloads to backend devices and is
//!   the production [`camrelay_core::CommandForwarder`].
//! - [`RelayClient`] talks to a relay server: backend devices use it to
//!   register and send heartbeats, tools use it to forward commands.
//! - [`testing::TestServer`] runs an axum router on a random port for
//!   integration tests.
//!
//! # Example
//!
//! ```no_run
//! use camrelay_client::RelayClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RelayClient::new("http://localhost:3000")?.with_api_key("secret");
//!
//!     client
//!         .register("kitchen", "http://10.0.0.12:8080", Some("Kitchen Pi"))
//!         .await?;
//!
//!     let health = client.health().await?;
//!     println!("{} clients connected", health.connected_clients);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod forwarder;
pub mod testing;
pub mod types;

pub use client::RelayClient;
pub use error::{RelayClientError, Result};
pub use forwarder::HttpForwarder;
pub use types::*;
