//! camrelayd - Camera relay daemon
//!
//! Accepts voice-assistant requests and generic command calls, and forwards
//! them to camera devices that register themselves with the relay.
//!
//! Usage:
//!   camrelayd [OPTIONS]
//!   camrelayd --config camrelay.toml --port 3000 --api-key s3cret
//!
//! Flags override values from the config file.

use std::sync::Arc;

use anyhow::Context;
use camrelay_api::{create_router, ApiKeyAuth, AppState};
use camrelay_client::HttpForwarder;
use camrelay_core::{CommandRouter, Registry, Sweeper, SweeperConfig};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::{Overrides, RelayConfig};

const DEFAULT_LOG_FILTER: &str =
    "camrelayd=info,camrelay_api=info,camrelay_core=info,camrelay_client=info";

#[derive(Parser, Debug)]
#[command(name = "camrelayd")]
#[command(about = "HTTP relay between a voice assistant and camera devices")]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short = 'f', long)]
    config: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Shared secret required on /api routes
    #[arg(long, env = "CAMRELAY_API_KEY")]
    api_key: Option<String>,

    /// Backend used when no registered device matches
    #[arg(long, env = "CAMRELAY_DEFAULT_BACKEND")]
    default_backend: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    tracing::info!("Starting camrelayd");

    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("Loading config from: {}", path);
            RelayConfig::load(path)?
        }
        None => {
            tracing::info!("No config file provided, using defaults");
            RelayConfig::default()
        }
    };
    config.apply_overrides(Overrides {
        port: args.port,
        api_key: args.api_key,
        default_backend: args.default_backend,
    });
    config.validate()?;

    // Core
    let registry = Arc::new(Registry::with_display_name(
        config.backend.default_url.clone(),
        config.registry.default_display_name.clone(),
    ));
    let forwarder = HttpForwarder::new().context("Failed to create HTTP forwarder")?;
    let router = CommandRouter::new(registry.clone(), Arc::new(forwarder), config.forward_timeout());

    let sweeper = Sweeper::spawn(
        registry.clone(),
        SweeperConfig {
            interval: config.sweep_interval(),
            stale_after: config.stale_after(),
        },
    );

    // HTTP
    let mut state =
        AppState::new(router).with_assistant_client_id(config.assistant.client_id.clone());
    match config.api_key() {
        Some(key) => {
            let auth = ApiKeyAuth::with_header(key, &config.auth.header)
                .map_err(anyhow::Error::msg)?;
            tracing::info!(header = %auth.header(), "Shared-secret auth enabled");
            state = state.with_auth(auth);
        }
        None => {
            tracing::warn!("No API key configured, /api routes are unauthenticated");
        }
    }

    let app = create_router(state);
    let addr = config.listen_addr()?;

    tracing::info!(
        default_backend = %config.backend.default_url,
        forward_timeout_ms = config.backend.forward_timeout_ms,
        "Listening on http://{}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.stop().await;
    tracing::info!("camrelayd stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
